// ============================================================
// Layer 2 — TestUseCase
// ============================================================
// Evaluates the best checkpoint of a finished run:
//
//   Step 1: Locate the run directory from the run options
//   Step 2: Reload train_config.json       (Layer 6 - infra)
//   Step 3: Seed with the run's seed and
//           build the test loader          (Layer 4 - data)
//   Step 4: Rebuild the network and load
//           best_model weights             (Layer 5 / 6)
//   Step 5: Monte Carlo evaluation and
//           test_results.json              (Layer 5 / 6)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::application::train_use_case::TrainConfig;
use crate::backend::{default_device, seed, Device, InferenceBackend};
use crate::data::loader::{load_dataset, PhaseLoaders};
use crate::domain::{error::PipelineResult, options::Phase};
use crate::infra::{checkpoint::CheckpointManager, run_dir::RunKey};
use crate::ml::{
    evaluator::{evaluate, UncertaintyReport},
    models::{load_model, with_network},
};

/// Options of the `test` command. The first five select the run
/// directory exactly as `train` named it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub dataset:             String,
    pub model:               String,
    pub dropout:             f64,
    pub activation_function: String,
    pub batch_size:          usize,
    pub results_dir:         String,
    pub data_dir:            String,
    pub num_workers:         usize,
    /// Stochastic forward passes per test batch
    pub samples:             usize,
}

impl TestConfig {
    pub fn run_key(&self) -> PipelineResult<RunKey> {
        Ok(RunKey {
            model:      self.model.parse()?,
            dataset:    self.dataset.parse()?,
            dropout:    self.dropout,
            activation: self.activation_function.parse()?,
            batch_size: self.batch_size,
        })
    }
}

pub struct TestUseCase {
    config: TestConfig,
}

impl TestUseCase {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<UncertaintyReport> {
        let cfg = &self.config;

        // ── Step 1: Run directory ─────────────────────────────────────────────
        let run_dir = cfg.run_key()?.run_dir(Path::new(&cfg.results_dir));
        if !run_dir.is_dir() {
            bail!("No trained run at '{}'; run 'train' with the same options first", run_dir.display());
        }
        let checkpoints = CheckpointManager::new(&run_dir)?;

        // ── Step 2: Training configuration ────────────────────────────────────
        let mut train_cfg     = checkpoints.load_config()?;
        train_cfg.data_dir    = cfg.data_dir.clone();
        train_cfg.num_workers = cfg.num_workers;

        // ── Step 3: Test loader ───────────────────────────────────────────────
        let device  = default_device();
        seed(&device, train_cfg.seed);
        let loaders = load_dataset::<InferenceBackend>(
            &train_cfg.dataset,
            "test",
            &train_cfg.loader_options(),
            &device,
        )?;

        // ── Steps 4-5 ─────────────────────────────────────────────────────────
        self.run(&checkpoints, &train_cfg, &loaders, &device)
    }

    pub(crate) fn run(
        &self,
        checkpoints: &CheckpointManager,
        train_cfg:   &TrainConfig,
        loaders:     &PhaseLoaders<InferenceBackend>,
        device:      &Device,
    ) -> Result<UncertaintyReport> {
        // ── Step 4: Network with the best weights ─────────────────────────────
        let network = load_model::<InferenceBackend>(&train_cfg.model_options(), device)?;
        let network = checkpoints.load_best_network(network, device)?;

        // ── Step 5: Monte Carlo evaluation ────────────────────────────────────
        let loader = loaders.phase(Phase::Test)?;
        tracing::info!(
            "Evaluating {} test samples with {} stochastic passes each",
            loader.num_items(),
            self.config.samples
        );
        let report = with_network!(&network, model => evaluate(model, loader, self.config.samples))?;

        let path = checkpoints.dir().join("test_results.json");
        fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        println!(
            "Test accuracy: {:.2}%  mean entropy: {:.4}  mean variance: {:.6}",
            report.accuracy, report.mean_entropy, report.mean_variance
        );
        Ok(report)
    }
}
