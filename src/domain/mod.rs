// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that name the concepts of a training run:
// the option vocabulary (datasets, models, activations, ...),
// the error taxonomy, the per-dataset class information and
// the prior used by variational layers.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// Error taxonomy shared by every layer
pub mod error;

/// Parsed run options (dataset, model, activation, phase, ...)
pub mod options;

/// Per-dataset class index mapping and channel count
pub mod data_info;

/// Prior and posterior initialisation of variational layers
pub mod priors;

/// A single decoded, labelled image
pub mod image;

/// Core abstractions (traits) that other layers implement
pub mod traits;
