// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from files on disk to normalised tensor batches:
//
//   MnistSource / CifarSource / CrcSource   → Vec<ImageSample>
//       │
//       ▼
//   select_classes     → keep the classes of data_info.json
//       │
//       ▼
//   split_train_val    → seeded train / validation partition
//       │
//       ▼
//   ImageDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher       → stacks and normalises samples
//       │
//       ▼
//   PhaseLoaders       → one Burn DataLoader per phase

/// MNIST through Burn's vision dataset
pub mod mnist;

/// CIFAR10 binary batches
pub mod cifar;

/// Colorectal cancer histology image folder
pub mod crc;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Implements Burn's Batcher trait to create normalised tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;

/// Dataset/dataloader factory keyed by phase
pub mod loader;
