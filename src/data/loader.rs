// ============================================================
// Layer 4 — Dataset / DataLoader Factory
// ============================================================
// Builds the phase-keyed batch iterators a run consumes:
//
//   mode "train" → { train, val }
//       val   = seeded random subset of the nominal training set
//       train = the rest, reshuffled every epoch (seeded)
//   mode "test"  → { test }
//
// The dataset name and the mode are parsed before anything is
// read from disk, so an unsupported option never costs I/O.
// MNIST and CIFAR10 download missing files; CRC must already
// be present under the data root.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder, DataLoaderIterator},
    prelude::*,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    cifar::CifarSource,
    crc::CrcSource,
    dataset::ImageDataset,
    mnist::MnistSource,
    splitter::split_train_val,
};
use crate::domain::error::PipelineError;
use crate::domain::image::ImageSample;
use crate::domain::options::{DatasetName, Phase, RunMode};
use crate::domain::traits::ImageSource;

/// Everything the factory needs besides the dataset name and mode.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Directory holding `cifar-10-batches-bin/` and `CRC/`
    pub data_root:   PathBuf,
    pub val_split:   f64,
    pub batch_size:  usize,
    pub num_workers: usize,
    pub seed:        u64,
    /// Raw labels to keep; empty keeps every class unchanged
    pub class_index: Vec<usize>,
}

impl LoaderOptions {
    fn validate(&self, mode: RunMode) -> Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidOption("batch size must be at least 1".into()));
        }
        if mode == RunMode::Train && !(self.val_split > 0.0 && self.val_split < 1.0) {
            return Err(PipelineError::InvalidOption(format!(
                "validation split must be in (0, 1), got {}",
                self.val_split
            )));
        }
        Ok(())
    }
}

// ─── PhaseLoader ──────────────────────────────────────────────────────────────
/// One Burn DataLoader plus the size of the dataset behind it.
pub struct PhaseLoader<B: Backend> {
    loader:     Arc<dyn DataLoader<B, ImageBatch<B>>>,
    num_items:  usize,
    batch_size: usize,
}

impl<B: Backend> PhaseLoader<B> {
    pub fn iter(&self) -> Box<dyn DataLoaderIterator<ImageBatch<B>> + '_> {
        self.loader.iter()
    }

    /// Number of samples in the underlying dataset
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn num_batches(&self) -> usize {
        self.num_items.div_ceil(self.batch_size)
    }
}

// ─── PhaseLoaders ─────────────────────────────────────────────────────────────
pub struct PhaseLoaders<B: Backend> {
    loaders: BTreeMap<Phase, PhaseLoader<B>>,
}

impl<B: Backend> PhaseLoaders<B> {
    /// Phases present, in iteration order (train before val)
    pub fn phases(&self) -> Vec<Phase> {
        self.loaders.keys().copied().collect()
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseLoader<B>> {
        self.loaders.get(&phase)
    }

    pub fn phase(&self, phase: Phase) -> Result<&PhaseLoader<B>> {
        self.get(phase)
            .with_context(|| format!("No '{phase}' loader; was the dataset loaded in the right mode?"))
    }
}

// ─── Factory ──────────────────────────────────────────────────────────────────
/// Select a dataset by name and return its phase-keyed loaders.
pub fn load_dataset<B: Backend>(
    dataset_name: &str,
    mode:         &str,
    opts:         &LoaderOptions,
    device:       &B::Device,
) -> Result<PhaseLoaders<B>> {
    let dataset: DatasetName = dataset_name.parse()?;
    let mode: RunMode        = mode.parse()?;
    opts.validate(mode)?;

    let source  = source_for(dataset, &opts.data_root);
    let raw     = source.load(mode)?;
    let samples = select_classes(raw, &opts.class_index);
    tracing::info!("{}: {} samples after class selection", source.name(), samples.len());

    let loaders = build_loaders(dataset, mode, samples, opts, device)?;
    tracing::debug!("{} loaders ready: {:?}", dataset, loaders.phases());
    Ok(loaders)
}

/// The ImageSource reading `dataset` under `data_root`.
pub fn source_for(dataset: DatasetName, data_root: &std::path::Path) -> Box<dyn ImageSource> {
    match dataset {
        DatasetName::Mnist   => Box::new(MnistSource),
        DatasetName::Cifar10 => Box::new(CifarSource::new(data_root)),
        DatasetName::Crc     => Box::new(CrcSource::new(data_root)),
    }
}

/// Drop samples whose label is not in `class_index` and renumber the
/// rest by their position in it.
pub fn select_classes(samples: Vec<ImageSample>, class_index: &[usize]) -> Vec<ImageSample> {
    if class_index.is_empty() {
        return samples;
    }
    samples
        .into_iter()
        .filter_map(|mut s| {
            let label = class_index.iter().position(|&c| c == s.label)?;
            s.label = label;
            Some(s)
        })
        .collect()
}

/// Wrap already loaded samples into the loaders of `mode`.
pub fn build_loaders<B: Backend>(
    dataset: DatasetName,
    mode:    RunMode,
    samples: Vec<ImageSample>,
    opts:    &LoaderOptions,
    device:  &B::Device,
) -> Result<PhaseLoaders<B>> {
    opts.validate(mode)?;

    let batcher = ImageBatcher::for_dataset(dataset);
    if let Some(bad) = samples.iter().find(|s| s.channels != batcher.channels()) {
        return Err(PipelineError::InvalidOption(format!(
            "{dataset} expects {} channel(s) but a sample has {}",
            batcher.channels(),
            bad.channels
        ))
        .into());
    }

    let mut loaders = BTreeMap::new();
    match mode {
        RunMode::Train => {
            let (train, val) = split_train_val(samples, opts.val_split, opts.seed);
            if train.is_empty() || val.is_empty() {
                return Err(PipelineError::InvalidOption(format!(
                    "split produced {} train / {} val samples; both must be non-empty",
                    train.len(),
                    val.len()
                ))
                .into());
            }
            tracing::info!("Split: {} train, {} validation", train.len(), val.len());
            loaders.insert(Phase::Train, make_loader(batcher.clone(), train, Some(opts.seed), opts, device));
            loaders.insert(Phase::Val, make_loader(batcher, val, None, opts, device));
        }
        RunMode::Test => {
            if samples.is_empty() {
                return Err(PipelineError::InvalidOption("test set is empty".into()).into());
            }
            loaders.insert(Phase::Test, make_loader(batcher, samples, None, opts, device));
        }
    }

    Ok(PhaseLoaders { loaders })
}

fn make_loader<B: Backend>(
    batcher: ImageBatcher,
    samples: Vec<ImageSample>,
    shuffle: Option<u64>,
    opts:    &LoaderOptions,
    device:  &B::Device,
) -> PhaseLoader<B> {
    let num_items = samples.len();

    let mut builder = DataLoaderBuilder::new(batcher)
        .batch_size(opts.batch_size)
        .set_device(device.clone());
    if let Some(seed) = shuffle {
        builder = builder.shuffle(seed);
    }
    if opts.num_workers > 0 {
        builder = builder.num_workers(opts.num_workers);
    }
    let loader: Arc<dyn DataLoader<B, ImageBatch<B>>> = builder.build(ImageDataset::new(samples));

    PhaseLoader { loader, num_items, batch_size: opts.batch_size }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// MNIST-shaped samples with labels cycling through 0..10
    pub(crate) fn synthetic_mnist(count: usize) -> Vec<ImageSample> {
        (0..count)
            .map(|i| ImageSample::new(vec![(i % 7) as f32 / 7.0; 28 * 28], [1, 28, 28], i % 10))
            .collect()
    }

    pub(crate) fn options(data_root: PathBuf) -> LoaderOptions {
        LoaderOptions {
            data_root,
            val_split:   0.2,
            batch_size:  8,
            num_workers: 0,
            seed:        25,
            class_index: Vec::new(),
        }
    }

    #[test]
    fn test_fake_dataset_fails_before_io() {
        // The data root does not exist: any attempt to read would fail
        // with an I/O error rather than UnsupportedDataset.
        let opts = options(PathBuf::from("/definitely/not/here"));
        let err  = load_dataset::<TestBackend>("FAKE", "train", &opts, &Default::default())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedDataset(name)) if name == "FAKE"
        ));
    }

    #[test]
    fn test_unknown_mode_fails_before_io() {
        let opts = options(PathBuf::from("/definitely/not/here"));
        let err  = load_dataset::<TestBackend>("CIFAR10", "eval", &opts, &Default::default())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_train_mode_exposes_train_and_val() {
        let opts    = options(PathBuf::new());
        let loaders = build_loaders::<TestBackend>(
            DatasetName::Mnist, RunMode::Train, synthetic_mnist(50), &opts, &Default::default(),
        )
        .unwrap();

        assert_eq!(loaders.phases(), vec![Phase::Train, Phase::Val]);
        assert_eq!(loaders.get(Phase::Val).unwrap().num_items(), 10);
        assert_eq!(loaders.get(Phase::Train).unwrap().num_items(), 40);
        assert_eq!(loaders.get(Phase::Train).unwrap().num_batches(), 5);
        assert!(loaders.get(Phase::Test).is_none());

        let seen: usize = loaders.get(Phase::Val).unwrap().iter().map(|b| b.len()).sum();
        assert_eq!(seen, 10);
    }

    #[test]
    fn test_test_mode_exposes_only_test() {
        let opts    = options(PathBuf::new());
        let loaders = build_loaders::<TestBackend>(
            DatasetName::Mnist, RunMode::Test, synthetic_mnist(12), &opts, &Default::default(),
        )
        .unwrap();

        assert_eq!(loaders.phases(), vec![Phase::Test]);
        let batch = loaders.get(Phase::Test).unwrap().iter().next().unwrap();
        assert_eq!(batch.images.dims(), [8, 1, 28, 28]);
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let opts = options(PathBuf::new());
        let res  = build_loaders::<TestBackend>(
            DatasetName::Cifar10, RunMode::Test, synthetic_mnist(4), &opts, &Default::default(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_class_selection_remaps_labels() {
        let kept = select_classes(synthetic_mnist(20), &[7, 3]);
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|s| s.label < 2));
        assert_eq!(kept.iter().filter(|s| s.label == 0).count(), 2);
    }

    #[test]
    fn test_crc_phase_keys_for_both_modes() {
        let root = tempfile::tempdir().unwrap();
        crate::data::crc::tests::write_fake_tiles(root.path(), "train", &["A", "B"], 5);
        crate::data::crc::tests::write_fake_tiles(root.path(), "test", &["A", "B"], 1);
        let opts = options(root.path().to_path_buf());

        let train = load_dataset::<TestBackend>("CRC", "train", &opts, &Default::default()).unwrap();
        assert_eq!(train.phases(), vec![Phase::Train, Phase::Val]);
        assert_eq!(train.get(Phase::Val).unwrap().num_items(), 2);

        let test = load_dataset::<TestBackend>("CRC", "test", &opts, &Default::default()).unwrap();
        assert_eq!(test.phases(), vec![Phase::Test]);
    }

    #[test]
    fn test_cifar_phase_keys_for_both_modes() {
        let root = tempfile::tempdir().unwrap();
        let dir  = root.path().join("cifar-10-batches-bin");
        std::fs::create_dir_all(&dir).unwrap();
        for file in crate::data::cifar::TRAIN_FILES {
            std::fs::write(dir.join(file), crate::data::cifar::tests::fake_records(4)).unwrap();
        }
        std::fs::write(dir.join("test_batch.bin"), crate::data::cifar::tests::fake_records(3)).unwrap();
        let opts = options(root.path().to_path_buf());

        let train = load_dataset::<TestBackend>("CIFAR10", "train", &opts, &Default::default()).unwrap();
        assert_eq!(train.phases(), vec![Phase::Train, Phase::Val]);
        assert_eq!(train.get(Phase::Val).unwrap().num_items(), 4);

        let test = load_dataset::<TestBackend>("CIFAR10", "test", &opts, &Default::default()).unwrap();
        assert_eq!(test.phases(), vec![Phase::Test]);
        assert_eq!(test.get(Phase::Test).unwrap().num_items(), 3);
    }
}
