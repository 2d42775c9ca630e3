// ============================================================
// Layer 6 — Run Directory Layout
// ============================================================
// Each run writes into a directory named after its options:
//
//   results/
//     mcdrop/
//       model-MCDROP3CONV3FC-dataset-MNIST-dropout-0.5-actfunc-softplus-batchsize-256/
//         log.txt  scalars.csv  train_config.json
//         best_model.mpk  best_optimizer.mpk  best_model.json
//     varinf/
//       ...
//
// Re-running with the same options overwrites the same directory.

use std::path::{Path, PathBuf};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::options::{ActivationKind, DatasetName, ModelName};

/// The options that name a run directory.
#[derive(Debug, Clone)]
pub struct RunKey {
    pub model:      ModelName,
    pub dataset:    DatasetName,
    pub dropout:    f64,
    pub activation: ActivationKind,
    pub batch_size: usize,
}

impl RunKey {
    pub fn dir_name(&self) -> String {
        format!(
            "model-{}-dataset-{}-dropout-{}-actfunc-{}-batchsize-{}",
            self.model, self.dataset, self.dropout, self.activation, self.batch_size
        )
    }

    /// `<results_root>/<mcdrop|varinf>/<dir_name>`
    pub fn run_dir(&self, results_root: &Path) -> PathBuf {
        results_root
            .join(self.model.family().dir_name())
            .join(self.dir_name())
    }
}

/// Refuse to run unless the working directory is named `expected`.
pub fn check_base_dir(cwd: &Path, expected: &str) -> PipelineResult<()> {
    let found = cwd
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if found == expected {
        Ok(())
    } else {
        Err(PipelineError::WrongBaseDir { expected: expected.to_string(), found })
    }
}
