// ============================================================
// Layer 4 — Glyph Batcher
// ============================================================
// Stacks normalised glyph samples into tensors for the model:
//
//   Input:  Vec of N GlyphSamples, each H*W floats
//   Output: images  [N, 1, H, W]   float
//           targets [N]            int
//
// Every sample was produced by the same GlyphTransform, so all
// pixel buffers have the same length and a flat concat + reshape
// is enough. The DataLoader hands in the target device per batch.

use std::marker::PhantomData;

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::{dataset::GlyphSample, transform::GlyphTransform};

#[derive(Debug, Clone)]
pub struct GlyphBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct GlyphBatcher<B: Backend> {
    height:  usize,
    width:   usize,
    backend: PhantomData<B>,
}

impl<B: Backend> GlyphBatcher<B> {
    pub fn new(transform: &GlyphTransform) -> Self {
        Self {
            height:  transform.height as usize,
            width:   transform.width as usize,
            backend: PhantomData,
        }
    }
}

/// Build an `[n, 1, height, width]` tensor from `n` flat pixel buffers.
pub fn images_to_tensor<B: Backend>(
    pixels: Vec<f32>,
    n:      usize,
    height: usize,
    width:  usize,
    device: &B::Device,
) -> Tensor<B, 4> {
    Tensor::<B, 4>::from_data(TensorData::new(pixels, [n, 1, height, width]), device)
}

impl<B: Backend> Batcher<B, GlyphSample, GlyphBatch<B>> for GlyphBatcher<B> {
    fn batch(&self, items: Vec<GlyphSample>, device: &B::Device) -> GlyphBatch<B> {
        let n = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();
        let classes: Vec<i64> = items.iter().map(|s| s.class as i64).collect();

        let images  = images_to_tensor::<B>(pixels, n, self.height, self.width, device);
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(classes, [n]), device);

        GlyphBatch { images, targets }
    }
}
