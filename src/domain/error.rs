// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure the pipeline reports on purpose is a
// configuration problem: an option nobody supports, a value
// out of range, missing dataset files or the wrong working
// directory. All of them are fatal for the run.
//
// Numerical failures (divergence, NaN) are not represented
// here; they surface through Burn.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Wrong --dataset option; {0} is not supported. Supported datasets: [CRC|MNIST|CIFAR10]")]
    UnsupportedDataset(String),

    #[error(
        "Wrong --model option; {0} is not supported. \
         Supported models: [MCDROP3CONV3FC|VARINF3CONV3FC|MCDROPALEXNET|VARINFALEXNET]"
    )]
    UnsupportedModel(String),

    #[error("Wrong --activation-function option; {0} is not supported. Supported: [softplus|relu|tanh]")]
    UnsupportedActivation(String),

    #[error("Wrong --layer-type option; {0} is not supported. Supported: [bbb|lrt]")]
    UnsupportedLayerType(String),

    #[error("Wrong mode parameter; {0} is not supported. Supported modes: [train|test]")]
    UnsupportedMode(String),

    #[error(
        "Wrong --beta-type option; {0} is not supported. \
         Supported: [blundell|soenderby|standard|none|<number>]"
    )]
    UnsupportedBetaType(String),

    #[error("Wrong base dir '{found}', this program must be run from the {expected}/ directory")]
    WrongBaseDir { expected: String, found: String },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Dataset files at '{path}' are unusable: {reason}")]
    DatasetFiles { path: PathBuf, reason: String },
}

/// Result alias for code that only fails with a [`PipelineError`]
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn dataset_files(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DatasetFiles { path: path.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_rejected_value() {
        let err = PipelineError::UnsupportedDataset("FAKE".into());
        assert!(err.to_string().contains("FAKE"));
        assert!(err.to_string().contains("MNIST"));

        let err = PipelineError::WrongBaseDir { expected: "Project8".into(), found: "tmp".into() };
        assert!(err.to_string().contains("Project8/"));
    }
}
