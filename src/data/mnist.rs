// ============================================================
// Layer 4 — MNIST Source
// ============================================================
// Wraps Burn's vision MnistDataset. The first call downloads the
// IDX files into Burn's dataset cache; later calls read them
// from there. Items arrive as 28x28 grids of 0..=255 floats.

use anyhow::Result;
use burn::data::dataset::{
    vision::{MnistDataset, MnistItem},
    Dataset,
};

use crate::domain::image::ImageSample;
use crate::domain::options::RunMode;
use crate::domain::traits::ImageSource;

const SIDE: usize = 28;

pub struct MnistSource;

impl ImageSource for MnistSource {
    fn name(&self) -> &'static str {
        "MNIST"
    }

    fn load(&self, mode: RunMode) -> Result<Vec<ImageSample>> {
        tracing::info!("Loading MNIST ({:?} split), downloading if absent", mode);
        let dataset = match mode {
            RunMode::Train => MnistDataset::train(),
            RunMode::Test  => MnistDataset::test(),
        };
        Ok(dataset.iter().map(|item| to_sample(&item)).collect())
    }
}

fn to_sample(item: &MnistItem) -> ImageSample {
    let pixels = item
        .image
        .iter()
        .flat_map(|row| row.iter().map(|&p| p / 255.0))
        .collect();
    ImageSample::new(pixels, [1, SIDE, SIDE], item.label as usize)
}
