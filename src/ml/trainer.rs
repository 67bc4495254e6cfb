// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training uses TrainBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on ValidBackend (NdArray)
//   - The validation batcher must also use ValidBackend
//   - argmax(1) returns [batch, 1] so it is flattened before .equal()
//
// Losses are averaged per sample (sum of batch_loss * batch_len
// divided by the dataset size), so a short final batch does not
// skew the epoch figure.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::GlyphBatcher, dataset::GlyphDataset, transform::GlyphTransform};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{GlyphCnn, GlyphCnnConfig};

pub type TrainBackend = Autodiff<NdArray>;
pub type ValidBackend = NdArray;

/// Train a fresh model and return it on the inference backend.
pub fn run_training(
    cfg:           &TrainConfig,
    model_cfg:     &GlyphCnnConfig,
    transform:     &GlyphTransform,
    train_dataset: GlyphDataset,
    val_dataset:   GlyphDataset,
    metrics:       &MetricsLogger,
) -> Result<GlyphCnn<ValidBackend>> {
    if train_dataset.sample_count() == 0 {
        bail!("Training set is empty");
    }
    let device = NdArrayDevice::default();
    TrainBackend::seed(&device, cfg.seed);

    let mut model: GlyphCnn<TrainBackend> = model_cfg.init(&device);
    tracing::info!("Model ready: {} classes, input {}x{}",
        model_cfg.num_classes, model_cfg.input_height, model_cfg.input_width);

    let mut optim = AdamConfig::new().init();

    let train_len = train_dataset.sample_count();
    let val_len   = val_dataset.sample_count();

    let train_loader = DataLoaderBuilder::new(GlyphBatcher::<TrainBackend>::new(transform))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(GlyphBatcher::<ValidBackend>::new(transform))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;

        for batch in train_loader.iter() {
            let batch_len = batch.targets.dims()[0];
            let (loss, _) = model.forward_loss(batch.images, batch.targets);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>() * batch_len as f64;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut correct      = 0usize;

        for batch in val_loader.iter() {
            let batch_len = batch.targets.dims()[0];
            let (loss, logits) = model_valid.forward_loss(batch.images, batch.targets.clone());
            val_loss_sum += loss.into_scalar().elem::<f64>() * batch_len as f64;

            let predicted = logits.argmax(1).flatten::<1>(0, 1);
            let hits: i64 = predicted.equal(batch.targets).int().sum().into_scalar().elem::<i64>();
            correct += hits as usize;
        }

        let row = EpochMetrics::new(
            epoch,
            train_loss_sum / train_len as f64,
            if val_len > 0 { val_loss_sum / val_len as f64 } else { f64::NAN },
            if val_len > 0 { correct as f64 / val_len as f64 } else { 0.0 },
        );

        tracing::info!("Epoch: {}/{}", epoch, cfg.epochs);
        tracing::info!("Train Loss: {:.4} Val Loss: {:.4} Val Acc: {:.4}",
            row.train_loss, row.val_loss, row.val_acc);
        metrics.log(&row)?;
    }

    tracing::info!("Training complete!");
    Ok(model.valid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::GlyphSample;
    use burn::tensor::TensorData;

    #[test]
    fn backward_pass_handles_non_square_glyphs() {
        let device = NdArrayDevice::default();
        let model: GlyphCnn<TrainBackend> = GlyphCnnConfig::new(5, 10, 8).init(&device);
        let images  = Tensor::<TrainBackend, 4>::ones([2, 1, 10, 8], &device);
        let targets = Tensor::<TrainBackend, 1, Int>::from_data(TensorData::new(vec![0i64, 3], [2]), &device);

        let (loss, _) = model.forward_loss(images, targets);
        let grads = loss.backward();
        let conv1 = model.conv1.weight.val().grad(&grads).unwrap();
        assert_eq!(conv1.dims(), [32, 1, 3, 3]);
    }

    #[test]
    fn one_epoch_logs_one_metrics_row() {
        let dir = tempfile::tempdir().unwrap();
        let transform = GlyphTransform::default();
        let samples = |n: usize| -> Vec<GlyphSample> {
            (0..n)
                .map(|i| GlyphSample { pixels: vec![(i % 2) as f32; transform.len()], class: i % 2 })
                .collect()
        };
        let cfg = TrainConfig { batch_size: 4, epochs: 1, ..Default::default() };
        let metrics = MetricsLogger::new(dir.path()).unwrap();

        run_training(
            &cfg,
            &GlyphCnnConfig::new(2, 10, 8),
            &transform,
            GlyphDataset::new(samples(8)),
            GlyphDataset::new(samples(2)),
            &metrics,
        )
        .unwrap();

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }
}
