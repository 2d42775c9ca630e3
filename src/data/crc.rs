// ============================================================
// Layer 4 — CRC Source (colorectal cancer histology)
// ============================================================
// Image-folder layout, one sub-directory per tissue class:
//
//   <root>/CRC/train/<class>/<tile>.tif
//   <root>/CRC/test/<class>/<tile>.tif
//
// Class directories are sorted by name and numbered from 0.
// Tiles are decoded with the `image` crate and resized to
// IMAGE_SIZE x IMAGE_SIZE RGB.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::imageops::FilterType;

use crate::domain::error::PipelineError;
use crate::domain::image::ImageSample;
use crate::domain::options::RunMode;
use crate::domain::traits::ImageSource;

pub const IMAGE_SIZE: usize = 64;

const EXTENSIONS: [&str; 6] = ["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

pub struct CrcSource {
    dir: PathBuf,
}

impl CrcSource {
    /// `data_root` is the directory that contains `CRC/`
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { dir: data_root.into().join("CRC") }
    }
}

impl ImageSource for CrcSource {
    fn name(&self) -> &'static str {
        "CRC"
    }

    fn load(&self, mode: RunMode) -> Result<Vec<ImageSample>> {
        let split_dir = self.dir.join(match mode {
            RunMode::Train => "train",
            RunMode::Test  => "test",
        });

        let classes = class_dirs(&split_dir)?;
        if classes.is_empty() {
            return Err(PipelineError::dataset_files(&split_dir, "no class directories found").into());
        }

        let mut samples = Vec::new();
        for (label, class_dir) in classes.iter().enumerate() {
            for path in image_files(class_dir)? {
                samples.push(load_tile(&path, label)?);
            }
        }
        tracing::info!(
            "Loaded {} CRC tiles in {} classes from '{}'",
            samples.len(),
            classes.len(),
            split_dir.display()
        );
        Ok(samples)
    }
}

fn class_dirs(split_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(split_dir)
        .with_context(|| format!("Cannot read CRC directory '{}'", split_dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn image_files(class_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(class_dir)
        .with_context(|| format!("Cannot read class directory '{}'", class_dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_tile(path: &Path, label: usize) -> Result<ImageSample> {
    let img = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?
        .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle)
        .to_rgb8();

    // HWC (interleaved) → CHW (planar)
    let plane = IMAGE_SIZE * IMAGE_SIZE;
    let mut pixels = vec![0.0f32; 3 * plane];
    for (i, px) in img.pixels().enumerate() {
        for c in 0..3 {
            pixels[c * plane + i] = px[c] as f32 / 255.0;
        }
    }
    Ok(ImageSample::new(pixels, [3, IMAGE_SIZE, IMAGE_SIZE], label))
}
