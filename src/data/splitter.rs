// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the glyph samples with a seeded RNG and splits them
// into training and validation sets (80/20 by default). The
// glyph folders are grouped by label on disk, so the shuffle is
// what gives the validation set every class.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `train_fraction` is clamped to [0, 1]; the split point is
/// `floor(len * train_fraction)`.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).floor() as usize;

    let val = samples.split_off(split_at.min(total));

    tracing::debug!("Dataset split: {} training, {} validation", samples.len(), val.len());
    (samples, val)
}
