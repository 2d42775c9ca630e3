// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<ImageSample>
// into a pair of tensors:
//
//   images:  [batch_size, channels, height, width]  (normalised)
//   targets: [batch_size]                           (class ids)
//
// Normalisation is per channel: (x - mean[c]) / std[c], using the
// statistics of the dataset the samples come from.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::image::ImageSample;
use crate::domain::options::DatasetName;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    mean: Vec<f32>,
    std:  Vec<f32>,
}

impl ImageBatcher {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { mean, std }
    }

    /// Batcher using the normalisation constants of `dataset`
    pub fn for_dataset(dataset: DatasetName) -> Self {
        let (mean, std) = dataset.normalization();
        Self::new(mean, std)
    }

    pub fn channels(&self) -> usize {
        self.mean.len()
    }
}

impl<B: Backend> Batcher<B, ImageSample, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageSample>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        // The DataLoader never hands out empty batches and every sample
        // of a dataset shares its dimensions.
        let [channels, height, width] = items[0].dims();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(pixels, [batch_size, channels, height, width]),
            device,
        );

        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(self.mean.clone(), [1, channels, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(self.std.clone(), [1, channels, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let labels: Vec<i64> = items.iter().map(|s| s.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]),
            device,
        );

        ImageBatch { images, targets }
    }
}
