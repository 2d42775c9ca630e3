// ============================================================
// Backend Selection
// ============================================================
// NdArray (CPU) by default; the `wgpu` feature switches every
// run to the GPU. Training wraps the chosen backend in Autodiff,
// evaluation uses it directly.

use burn::{backend::Autodiff, tensor::backend::Backend};

#[cfg(feature = "wgpu")]
pub type InferenceBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InferenceBackend = burn::backend::NdArray;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<InferenceBackend>;

pub type Device = <InferenceBackend as Backend>::Device;

pub fn default_device() -> Device {
    Device::default()
}

/// Seed the backend RNG behind weight initialisation, dropout masks
/// and weight sampling. Autodiff forwards to the inner backend, so
/// this covers training and evaluation alike.
pub fn seed(device: &Device, seed: u64) {
    TrainingBackend::seed(device, seed);
}

/// Human-readable name of the compiled-in backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "WGPU (GPU)"
    }

    #[cfg(not(feature = "wgpu"))]
    {
        "NdArray (CPU)"
    }
}
