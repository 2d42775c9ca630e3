// ============================================================
// Layer 3 — Run Options
// ============================================================
// The CLI accepts free-form strings; everything downstream works
// with these enums. Parsing happens before any file is touched,
// so an unsupported option fails the run immediately.
//
// Each enum implements FromStr (string → enum, with the matching
// PipelineError on failure) and Display (enum → canonical name,
// used in run directory names and logs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

// ─── DatasetName ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetName {
    Mnist,
    Cifar10,
    /// Colorectal cancer histology tiles
    Crc,
}

impl DatasetName {
    pub const ALL: [DatasetName; 3] = [Self::Mnist, Self::Cifar10, Self::Crc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mnist   => "MNIST",
            Self::Cifar10 => "CIFAR10",
            Self::Crc     => "CRC",
        }
    }

    /// Per-channel (mean, std) applied to pixels scaled to [0, 1]
    pub fn normalization(&self) -> (Vec<f32>, Vec<f32>) {
        match self {
            Self::Mnist   => (vec![0.1307], vec![0.3081]),
            Self::Cifar10 => (vec![0.4914, 0.4822, 0.4465], vec![0.247, 0.243, 0.261]),
            Self::Crc     => (vec![0.5, 0.5, 0.5], vec![0.5, 0.5, 0.5]),
        }
    }
}

impl FromStr for DatasetName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| PipelineError::UnsupportedDataset(s.to_string()))
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── ModelName ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    McDrop3Conv3Fc,
    VarInf3Conv3Fc,
    McDropAlexNet,
    VarInfAlexNet,
}

/// The two uncertainty-estimation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    McDropout,
    VariationalInference,
}

impl ModelFamily {
    /// Name of the results sub-directory for this family
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::McDropout            => "mcdrop",
            Self::VariationalInference => "varinf",
        }
    }
}

impl ModelName {
    pub const ALL: [ModelName; 4] = [
        Self::McDrop3Conv3Fc,
        Self::VarInf3Conv3Fc,
        Self::McDropAlexNet,
        Self::VarInfAlexNet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::McDrop3Conv3Fc => "MCDROP3CONV3FC",
            Self::VarInf3Conv3Fc => "VARINF3CONV3FC",
            Self::McDropAlexNet  => "MCDROPALEXNET",
            Self::VarInfAlexNet  => "VARINFALEXNET",
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Self::McDrop3Conv3Fc | Self::McDropAlexNet => ModelFamily::McDropout,
            Self::VarInf3Conv3Fc | Self::VarInfAlexNet => ModelFamily::VariationalInference,
        }
    }
}

impl FromStr for ModelName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| PipelineError::UnsupportedModel(s.to_string()))
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── ActivationKind ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    Softplus,
    Relu,
    Tanh,
}

impl FromStr for ActivationKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "softplus" => Ok(Self::Softplus),
            "relu"     => Ok(Self::Relu),
            "tanh"     => Ok(Self::Tanh),
            other      => Err(PipelineError::UnsupportedActivation(other.to_string())),
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Softplus => "softplus",
            Self::Relu     => "relu",
            Self::Tanh     => "tanh",
        })
    }
}

// ─── LayerType ────────────────────────────────────────────────────────────────
/// How a variational layer draws its randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Bayes-by-Backprop: sample a weight tensor per forward pass
    Bbb,
    /// Local reparameterisation trick: sample the pre-activations
    Lrt,
}

impl FromStr for LayerType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bbb" => Ok(Self::Bbb),
            "lrt" => Ok(Self::Lrt),
            other => Err(PipelineError::UnsupportedLayerType(other.to_string())),
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bbb => "bbb",
            Self::Lrt => "lrt",
        })
    }
}

// ─── RunMode ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
}

impl FromStr for RunMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::Train),
            "test"  => Ok(Self::Test),
            other   => Err(PipelineError::UnsupportedMode(other.to_string())),
        }
    }
}

// ─── Phase ────────────────────────────────────────────────────────────────────
/// A named stage of an epoch. Only `Train` updates weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Train,
    Val,
    Test,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val   => "val",
            Self::Test  => "test",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── BetaType ─────────────────────────────────────────────────────────────────
/// Weighting of the KL term across the minibatches of an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BetaType {
    /// 2^(m-i) / (2^m - 1), Blundell et al. (2015)
    Blundell,
    /// Linear warm-up over the first quarter of the epochs
    Soenderby,
    /// 1 / m
    Standard,
    /// KL term ignored
    None,
    Fixed(f64),
}

impl FromStr for BetaType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blundell"  => Ok(Self::Blundell),
            "soenderby" => Ok(Self::Soenderby),
            "standard"  => Ok(Self::Standard),
            "none"      => Ok(Self::None),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|b| b.is_finite() && *b >= 0.0)
                .map(Self::Fixed)
                .ok_or_else(|| PipelineError::UnsupportedBetaType(s.to_string())),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dataset_name_round_trips() {
        for name in DatasetName::ALL {
            assert_eq!(name.as_str().parse::<DatasetName>().unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_dataset_is_rejected() {
        let err = "FAKE".parse::<DatasetName>().unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedDataset(ref s) if s == "FAKE"));
        // names are case sensitive, as on the command line
        assert!("mnist".parse::<DatasetName>().is_err());
    }

    #[test]
    fn test_model_families() {
        assert_eq!("MCDROP3CONV3FC".parse::<ModelName>().unwrap().family(), ModelFamily::McDropout);
        assert_eq!("MCDROPALEXNET".parse::<ModelName>().unwrap().family(), ModelFamily::McDropout);
        assert_eq!(
            "VARINFALEXNET".parse::<ModelName>().unwrap().family(),
            ModelFamily::VariationalInference
        );
        assert!(matches!(
            "RESNET".parse::<ModelName>(),
            Err(PipelineError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_activation_and_layer_type_parsing() {
        assert_eq!("tanh".parse::<ActivationKind>().unwrap(), ActivationKind::Tanh);
        assert!(matches!(
            "sigmoid".parse::<ActivationKind>(),
            Err(PipelineError::UnsupportedActivation(_))
        ));
        assert_eq!("lrt".parse::<LayerType>().unwrap(), LayerType::Lrt);
        assert!(matches!(
            "flipout".parse::<LayerType>(),
            Err(PipelineError::UnsupportedLayerType(_))
        ));
    }

    #[test]
    fn test_run_mode_parsing() {
        assert_eq!("train".parse::<RunMode>().unwrap(), RunMode::Train);
        assert_eq!("test".parse::<RunMode>().unwrap(), RunMode::Test);
        assert!(matches!("eval".parse::<RunMode>(), Err(PipelineError::UnsupportedMode(_))));
    }

    #[test]
    fn test_beta_type_parsing() {
        assert_eq!("Blundell".parse::<BetaType>().unwrap(), BetaType::Blundell);
        assert_eq!("0.1".parse::<BetaType>().unwrap(), BetaType::Fixed(0.1));
        assert!("-1".parse::<BetaType>().is_err());
        assert!("warm".parse::<BetaType>().is_err());
    }
}
