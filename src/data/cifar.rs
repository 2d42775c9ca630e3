// ============================================================
// Layer 4 — CIFAR10 Source
// ============================================================
// Reads the binary distribution of CIFAR10:
//
//   <root>/cifar-10-batches-bin/
//     data_batch_1.bin ... data_batch_5.bin   ← training set
//     test_batch.bin                          ← test set
//
// Each record is 3073 bytes: one label byte followed by the
// 32x32 red, green and blue planes (already channel-major).
//
// When the batches directory is missing, the tarball is fetched
// into <root> and unpacked there. A tarball left over from an
// interrupted run is extracted without downloading it again.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::domain::error::PipelineError;
use crate::domain::image::ImageSample;
use crate::domain::options::RunMode;
use crate::domain::traits::ImageSource;

const SIDE:        usize = 32;
const PLANE:       usize = SIDE * SIDE;
const RECORD_SIZE: usize = 1 + 3 * PLANE;

pub const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
pub const TEST_FILES: [&str; 1] = ["test_batch.bin"];

const ARCHIVE_URL:  &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";
const ARCHIVE_NAME: &str = "cifar-10-binary.tar.gz";
const BATCHES_DIR:  &str = "cifar-10-batches-bin";

pub struct CifarSource {
    root: PathBuf,
    dir:  PathBuf,
}

impl CifarSource {
    /// `data_root` is the directory that contains `cifar-10-batches-bin`
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let root = data_root.into();
        let dir  = root.join(BATCHES_DIR);
        Self { root, dir }
    }

    /// Make sure the batches directory exists, downloading and
    /// extracting the archive if needed. Returns true when anything
    /// had to be fetched or unpacked.
    pub fn ensure_present(&self) -> Result<bool> {
        if self.dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Cannot create data root '{}'", self.root.display()))?;

        let archive = self.root.join(ARCHIVE_NAME);
        if archive.exists() {
            tracing::info!("Found '{}', skipping download", archive.display());
        } else {
            download(ARCHIVE_URL, &archive)?;
        }

        tracing::info!("Extracting '{}'", archive.display());
        extract_tar_gz(&archive, &self.root)?;
        if !self.dir.is_dir() {
            return Err(PipelineError::dataset_files(&archive, format!("archive has no '{BATCHES_DIR}' directory")).into());
        }
        Ok(true)
    }
}

fn download(url: &str, dest: &Path) -> Result<()> {
    tracing::info!("Downloading CIFAR10 from {url}");
    let bytes = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .with_context(|| format!("Failed to download '{url}'"))?;

    // Renamed into place only once fully written
    let partial = dest.with_extension("part");
    fs::write(&partial, &bytes)
        .with_context(|| format!("Cannot write '{}'", partial.display()))?;
    fs::rename(&partial, dest)
        .with_context(|| format!("Cannot move archive to '{}'", dest.display()))?;

    tracing::info!("Downloaded {} bytes", bytes.len());
    Ok(())
}

fn extract_tar_gz(archive: &Path, out_dir: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("Cannot open '{}'", archive.display()))?;
    tar::Archive::new(flate2::read::GzDecoder::new(file))
        .unpack(out_dir)
        .with_context(|| format!("Failed to extract '{}'", archive.display()))
}

impl ImageSource for CifarSource {
    fn name(&self) -> &'static str {
        "CIFAR10"
    }

    fn load(&self, mode: RunMode) -> Result<Vec<ImageSample>> {
        self.ensure_present()?;

        let files: &[&str] = match mode {
            RunMode::Train => &TRAIN_FILES,
            RunMode::Test  => &TEST_FILES,
        };

        let mut samples = Vec::new();
        for file in files {
            let path  = self.dir.join(file);
            let bytes = fs::read(&path).with_context(|| {
                format!(
                    "Cannot read '{}'. Delete the incomplete '{BATCHES_DIR}' directory to download it again.",
                    path.display()
                )
            })?;
            let before = samples.len();
            parse_records(&bytes, &mut samples)
                .map_err(|reason| PipelineError::dataset_files(&path, reason))?;
            tracing::debug!("Read {} images from '{}'", samples.len() - before, path.display());
        }
        Ok(samples)
    }
}

/// Decode concatenated CIFAR records, appending them to `out`.
pub fn parse_records(bytes: &[u8], out: &mut Vec<ImageSample>) -> std::result::Result<(), String> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(format!(
            "file length {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_SIZE
        ));
    }

    for record in bytes.chunks_exact(RECORD_SIZE) {
        let label = record[0] as usize;
        if label > 9 {
            return Err(format!("label {label} is outside 0..=9"));
        }
        let pixels = record[1..].iter().map(|&b| b as f32 / 255.0).collect();
        out.push(ImageSample::new(pixels, [3, SIDE, SIDE], label));
    }
    Ok(())
}
