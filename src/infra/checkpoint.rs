// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Keeps the single best checkpoint of a run, using Burn's
// CompactRecorder for tensors and serde_json for metadata.
//
// What gets saved when validation accuracy improves:
//   1. best_model.<ext>     — model weights (inference backend)
//   2. best_optimizer.<ext> — Adam moment estimates
//   3. best_model.json      — epoch and validation accuracy
//
// Plus, once per run:
//   train_config.json       — the resolved run configuration,
//                             needed to rebuild the architecture
//                             before weights can be loaded
//
// "Improves" is strict: an epoch that only ties the best
// accuracy so far does not replace the checkpoint.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::models::Network;

/// Contents of best_model.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModelInfo {
    pub epoch:    usize,
    /// Validation accuracy in percent
    pub accuracy: f64,
}

// ─── BestTracker ──────────────────────────────────────────────────────────────
/// Remembers the best validation accuracy seen so far.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: Option<BestModelInfo>,
}

impl BestTracker {
    /// Record `accuracy` for `epoch`; true iff it beats every earlier epoch.
    pub fn offer(&mut self, epoch: usize, accuracy: f64) -> bool {
        let improved = match &self.best {
            Some(best) => accuracy > best.accuracy,
            None       => !accuracy.is_nan(),
        };
        if improved {
            self.best = Some(BestModelInfo { epoch, accuracy });
        }
        improved
    }

    pub fn best(&self) -> Option<&BestModelInfo> {
        self.best.as_ref()
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Saves and restores the files of one run directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the best checkpoint with `model` and `optim`.
    pub fn save_best<B, M, O>(&self, model: &M, optim: &O, info: &BestModelInfo) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let recorder = CompactRecorder::new();

        // The recorder adds its own extension
        let model_path = self.dir.join("best_model");
        model
            .valid()
            .save_file(model_path.clone(), &recorder)
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;

        let optim_path = self.dir.join("best_optimizer");
        Recorder::<B>::record(&recorder, optim.to_record(), optim_path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", optim_path.display()))?;

        let info_path = self.dir.join("best_model.json");
        fs::write(&info_path, serde_json::to_string_pretty(info)?)
            .with_context(|| format!("Failed to write '{}'", info_path.display()))?;

        tracing::debug!("Saved best checkpoint: epoch {}, accuracy {:.2}%", info.epoch, info.accuracy);
        Ok(())
    }

    /// Load the best weights into an already constructed `network`.
    ///
    /// The network must have the architecture recorded in
    /// train_config.json or loading will fail.
    pub fn load_best_network<B: Backend>(&self, network: Network<B>, device: &B::Device) -> Result<Network<B>> {
        let path     = self.dir.join("best_model");
        let recorder = CompactRecorder::new();
        let context  = || {
            format!("Cannot load checkpoint '{}'. Has this run been trained?", path.display())
        };

        let network = match network {
            Network::McDrop3Conv3Fc(m) => {
                Network::McDrop3Conv3Fc(m.load_file(path.clone(), &recorder, device).with_context(context)?)
            }
            Network::VarInf3Conv3Fc(m) => {
                Network::VarInf3Conv3Fc(m.load_file(path.clone(), &recorder, device).with_context(context)?)
            }
            Network::McDropAlexNet(m) => {
                Network::McDropAlexNet(m.load_file(path.clone(), &recorder, device).with_context(context)?)
            }
            Network::VarInfAlexNet(m) => {
                Network::VarInfAlexNet(m.load_file(path.clone(), &recorder, device).with_context(context)?)
            }
        };

        if let Ok(info) = self.best_info() {
            tracing::info!("Loaded checkpoint from epoch {} ({:.2}%)", info.epoch, info.accuracy);
        }
        Ok(network)
    }

    pub fn best_info(&self) -> Result<BestModelInfo> {
        let path = self.dir.join("best_model.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save the resolved run configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' with the same options before 'test'.",
                    path.display()
                )
            })?;

        Ok(serde_json::from_str(&json)?)
    }
}
