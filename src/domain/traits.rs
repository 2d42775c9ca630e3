// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The data layer reads MNIST through Burn, CIFAR10 from its
// binary distribution and CRC from an image folder. The loader
// factory only sees ImageSource, so adding a dataset means
// adding one implementation.

use anyhow::Result;

use crate::domain::image::ImageSample;
use crate::domain::options::RunMode;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Anything that can produce the labelled images of a dataset.
///
/// Implementations:
///   - MnistSource  → Burn's vision dataset (downloads on first use)
///   - CifarSource  → cifar-10-batches-bin/*.bin (downloads if absent)
///   - CrcSource    → CRC/{train,test}/<class>/<image>
pub trait ImageSource {
    /// Canonical dataset name, used in log lines
    fn name(&self) -> &'static str;

    /// Load the nominal training set (`RunMode::Train`) or the
    /// test set (`RunMode::Test`). Labels are raw dataset labels.
    fn load(&self, mode: RunMode) -> Result<Vec<ImageSample>>;
}
