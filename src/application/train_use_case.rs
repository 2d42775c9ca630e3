// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Validate every option          (Layer 3 - domain)
//   Step 2: Resolve classes and channels
//           from data_info.json            (Layer 3 - domain)
//   Step 3: Seed the backend RNG and build
//           train/val loaders              (Layer 4 - data)
//   Step 4: Create the run directory,
//           log.txt, scalars.csv and
//           train_config.json              (Layer 6 - infra)
//   Step 5: Build the model                (Layer 5 - ml)
//   Step 6: Run the training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::backend::{backend_name, default_device, seed, Device, TrainingBackend};
use crate::data::loader::{load_dataset, LoaderOptions, PhaseLoaders};
use crate::domain::{
    data_info::DataInfoTable,
    error::{PipelineError, PipelineResult},
    options::{ActivationKind, BetaType, DatasetName, LayerType, ModelFamily, ModelName},
    priors::PriorConfig,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::ScalarWriter,
    run_dir::RunKey,
    run_log::RunLog,
};
use crate::ml::{
    models::{load_model, with_network, ModelOptions},
    trainer::{train, RunOutputs, TrainSettings, TrainSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All options of a training run. Names are kept as the strings
// the user typed; validate() parses them before anything touches
// the filesystem. Saved to train_config.json so `test` can rebuild
// the exact same network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset:              String,
    pub model:                String,
    pub dropout:              f64,
    pub activation_function:  String,
    pub batch_size:           usize,
    pub epochs:               usize,
    pub lr:                   f64,
    pub val_split:            f64,
    pub seed:                 u64,
    pub suppress_epoch_print: bool,
    /// Path of data_info.json
    pub data_info:            String,
    pub num_workers:          usize,
    pub layer_type:           String,
    pub beta_type:            String,
    #[serde(default)]
    pub priors:               PriorConfig,
    pub results_dir:          String,
    pub data_dir:             String,
    /// Filled from data_info.json
    #[serde(default)]
    pub class_index:          Vec<usize>,
    /// Filled from data_info.json
    #[serde(default)]
    pub input_channels:       usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset:              "MNIST".to_string(),
            model:                "MCDROP3CONV3FC".to_string(),
            dropout:              0.5,
            activation_function:  "softplus".to_string(),
            batch_size:           256,
            epochs:               200,
            lr:                   0.001,
            val_split:            0.2,
            seed:                 25,
            suppress_epoch_print: false,
            data_info:            "data/data_info.json".to_string(),
            num_workers:          4,
            layer_type:           "lrt".to_string(),
            beta_type:            "0.1".to_string(),
            priors:               PriorConfig::default(),
            results_dir:          "results".to_string(),
            data_dir:             "data".to_string(),
            class_index:          Vec::new(),
            input_channels:       0,
        }
    }
}

impl TrainConfig {
    /// Parse every named option and range-check every number.
    pub fn validate(&self) -> PipelineResult<()> {
        let _: DatasetName    = self.dataset.parse()?;
        let model: ModelName  = self.model.parse()?;
        let _: ActivationKind = self.activation_function.parse()?;
        let _: BetaType       = self.beta_type.parse()?;

        if model.family() == ModelFamily::VariationalInference {
            let _: LayerType = self.layer_type.parse()?;
            if !self.priors.is_valid() {
                return Err(PipelineError::InvalidOption(format!("invalid priors: {:?}", self.priors)));
            }
        }

        let invalid = |msg: String| Err(PipelineError::InvalidOption(msg));
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if self.batch_size == 0 {
            return invalid("batch size must be at least 1".to_string());
        }
        if self.epochs == 0 {
            return invalid("epochs must be at least 1".to_string());
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return invalid(format!("learning rate must be positive, got {}", self.lr));
        }
        if !(self.val_split > 0.0 && self.val_split < 1.0) {
            return invalid(format!("validation split must be in (0, 1), got {}", self.val_split));
        }
        Ok(())
    }

    pub fn run_key(&self) -> PipelineResult<RunKey> {
        Ok(RunKey {
            model:      self.model.parse()?,
            dataset:    self.dataset.parse()?,
            dropout:    self.dropout,
            activation: self.activation_function.parse()?,
            batch_size: self.batch_size,
        })
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            data_root:   self.data_dir.clone().into(),
            val_split:   self.val_split,
            batch_size:  self.batch_size,
            num_workers: self.num_workers,
            seed:        self.seed,
            class_index: self.class_index.clone(),
        }
    }

    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            model:          self.model.clone(),
            input_channels: self.input_channels,
            num_classes:    self.class_index.len(),
            activation:     self.activation_function.clone(),
            dropout:        self.dropout,
            priors:         self.priors.clone(),
            layer_type:     self.layer_type.clone(),
        }
    }

    pub fn train_settings(&self) -> PipelineResult<TrainSettings> {
        Ok(TrainSettings {
            epochs:               self.epochs,
            lr:                   self.lr,
            beta:                 self.beta_type.parse()?,
            suppress_epoch_print: self.suppress_epoch_print,
        })
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:       TrainConfig,
    /// Recorded as the first line of log.txt
    command_line: String,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, command_line: impl Into<String>) -> Self {
        Self { config, command_line: command_line.into() }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        // ── Steps 1-2: Validate and resolve ───────────────────────────────────
        let cfg = self.resolve()?;

        // ── Step 3: Seed, then data loaders ───────────────────────────────────
        let device = default_device();
        tracing::info!("Using backend {} on {:?}, seed {}", backend_name(), device, cfg.seed);
        seed(&device, cfg.seed);
        let loaders = load_dataset::<TrainingBackend>(&cfg.dataset, "train", &cfg.loader_options(), &device)?;

        // ── Steps 4-6 ─────────────────────────────────────────────────────────
        self.run(&cfg, &loaders, &device)
    }

    /// Validate the options, then fill in the class index and channel
    /// count of the dataset from data_info.json.
    pub fn resolve(&self) -> Result<TrainConfig> {
        self.config.validate()?;

        let path = Path::new(&self.config.data_info);
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read data info '{}'", path.display()))?;
        let table = DataInfoTable::from_json(&json)
            .with_context(|| format!("Malformed data info '{}'", path.display()))?;
        let info = table.get(&self.config.dataset)?;

        let mut cfg        = self.config.clone();
        cfg.class_index    = info.class_index.clone();
        cfg.input_channels = info.input_channels;
        tracing::info!(
            "{}: {} classes, {} input channel(s)",
            cfg.dataset,
            info.num_classes(),
            info.input_channels
        );
        Ok(cfg)
    }

    /// Everything after the loaders exist.
    pub(crate) fn run(
        &self,
        cfg:     &TrainConfig,
        loaders: &PhaseLoaders<TrainingBackend>,
        device:  &Device,
    ) -> Result<TrainSummary> {
        // ── Step 4: Run directory ─────────────────────────────────────────────
        let run_dir     = cfg.run_key()?.run_dir(Path::new(&cfg.results_dir));
        let checkpoints = CheckpointManager::new(&run_dir)?;
        checkpoints.save_config(cfg)?;
        let log         = RunLog::create(&run_dir, &self.command_line)?;
        let mut scalars = ScalarWriter::create(&run_dir)?;
        tracing::info!("Writing run outputs to '{}'", run_dir.display());

        // ── Step 5: Model ─────────────────────────────────────────────────────
        let network  = load_model::<TrainingBackend>(&cfg.model_options(), device)?;
        let settings = cfg.train_settings()?;

        // ── Step 6: Training loop ─────────────────────────────────────────────
        let outputs = RunOutputs { checkpoints: &checkpoints, log: &log, scalars: &mut scalars };
        with_network!(network, model => train(model, loaders, &settings, outputs))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::data::loader::{build_loaders, tests::synthetic_mnist};
    use crate::domain::options::RunMode;

    /// A resolved MNIST config writing into `results_dir`
    pub(crate) fn mnist_config(results_dir: &Path) -> TrainConfig {
        TrainConfig {
            epochs:               1,
            num_workers:          0,
            suppress_epoch_print: true,
            results_dir:          results_dir.to_string_lossy().into_owned(),
            class_index:          (0..10).collect(),
            input_channels:       1,
            ..TrainConfig::default()
        }
    }

    pub(crate) fn train_loaders(cfg: &TrainConfig, count: usize) -> PhaseLoaders<TrainingBackend> {
        build_loaders::<TrainingBackend>(
            DatasetName::Mnist,
            RunMode::Train,
            synthetic_mnist(count),
            &cfg.loader_options(),
            &default_device(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_epoch_on_mnist_shaped_data() {
        let results = tempfile::tempdir().unwrap();
        let cfg     = mnist_config(results.path());
        assert_eq!((cfg.seed, cfg.batch_size, cfg.dropout), (25, 256, 0.5));

        let use_case = TrainUseCase::new(cfg.clone(), "bayes-cnn train --epochs 1");
        let summary  = use_case.run(&cfg, &train_loaders(&cfg, 40), &default_device()).unwrap();
        assert_eq!(summary.history.len(), 1);
        assert_eq!(summary.best.as_ref().unwrap().epoch, 1);

        let run_dir = results
            .path()
            .join("mcdrop/model-MCDROP3CONV3FC-dataset-MNIST-dropout-0.5-actfunc-softplus-batchsize-256");

        let log = fs::read_to_string(run_dir.join("log.txt")).unwrap();
        assert_eq!(log.lines().next(), Some("bayes-cnn train --epochs 1"));
        assert_eq!(log.lines().filter(|l| l.starts_with("Epoch:")).count(), 1);

        assert!(run_dir.join("best_model.json").is_file());
        assert!(run_dir.join("train_config.json").is_file());
        let weights: Vec<PathBuf> = fs::read_dir(&run_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                let name = p.file_name().unwrap().to_string_lossy();
                name.starts_with("best_model") && !name.ends_with(".json")
            })
            .collect();
        assert_eq!(weights.len(), 1);
    }

    #[test]
    fn test_saved_config_round_trips() {
        let results  = tempfile::tempdir().unwrap();
        let cfg      = mnist_config(results.path());
        let use_case = TrainUseCase::new(cfg.clone(), "bayes-cnn train");
        use_case.run(&cfg, &train_loaders(&cfg, 20), &default_device()).unwrap();

        let run_dir  = cfg.run_key().unwrap().run_dir(results.path());
        let restored = CheckpointManager::new(run_dir).unwrap().load_config().unwrap();
        assert_eq!(restored.class_index, cfg.class_index);
        assert_eq!(restored.input_channels, 1);
        assert_eq!(restored.priors, cfg.priors);
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        let ok = TrainConfig::default();
        assert!(ok.validate().is_ok());

        let err = |cfg: TrainConfig| cfg.validate().unwrap_err();

        assert!(matches!(
            err(TrainConfig { dataset: "FAKE".into(), ..ok.clone() }),
            PipelineError::UnsupportedDataset(_)
        ));
        assert!(matches!(
            err(TrainConfig { model: "RESNET".into(), ..ok.clone() }),
            PipelineError::UnsupportedModel(_)
        ));
        assert!(matches!(
            err(TrainConfig { activation_function: "gelu".into(), ..ok.clone() }),
            PipelineError::UnsupportedActivation(_)
        ));
        assert!(matches!(
            err(TrainConfig { model: "VARINF3CONV3FC".into(), layer_type: "x".into(), ..ok.clone() }),
            PipelineError::UnsupportedLayerType(_)
        ));
        assert!(matches!(
            err(TrainConfig { beta_type: "warm".into(), ..ok.clone() }),
            PipelineError::UnsupportedBetaType(_)
        ));
        for bad in [
            TrainConfig { dropout: 1.0, ..ok.clone() },
            TrainConfig { batch_size: 0, ..ok.clone() },
            TrainConfig { epochs: 0, ..ok.clone() },
            TrainConfig { val_split: 1.0, ..ok.clone() },
            TrainConfig { lr: 0.0, ..ok.clone() },
        ] {
            assert!(matches!(err(bad), PipelineError::InvalidOption(_)));
        }

        // layer type only matters for variational models
        assert!(TrainConfig { layer_type: "x".into(), ..ok }.validate().is_ok());
    }

    #[test]
    fn test_fake_dataset_fails_before_reading_data_info() {
        let cfg = TrainConfig {
            dataset:   "FAKE".into(),
            data_info: "/definitely/not/here.json".into(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg, "").resolve().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedDataset(_))
        ));
    }

    #[test]
    fn test_resolve_reads_data_info() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_info.json");
        fs::write(&path, r#"{ "CIFAR10": { "class_index": [1, 9], "input_channels": 3 } }"#).unwrap();

        let base = TrainConfig { data_info: path.to_string_lossy().into_owned(), ..TrainConfig::default() };

        let cifar = TrainConfig { dataset: "CIFAR10".into(), ..base.clone() };
        let cfg   = TrainUseCase::new(cifar, "").resolve().unwrap();
        assert_eq!(cfg.class_index, vec![1, 9]);
        assert_eq!(cfg.model_options().num_classes, 2);
        assert_eq!(cfg.input_channels, 3);

        // supported by the crate but missing from this data_info.json
        let err = TrainUseCase::new(base, "").resolve().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedDataset(_))
        ));
    }
}
