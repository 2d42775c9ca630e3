// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Four architectures, two per uncertainty strategy:
//
//   MCDROP3CONV3FC  ┐ deterministic weights, dropout that stays
//   MCDROPALEXNET   ┘ on at evaluation time
//   VARINF3CONV3FC  ┐ Gaussian weights (Bayes-by-Backprop or
//   VARINFALEXNET   ┘ local reparameterisation), KL regularised
//
// Every network maps [batch, channels, H, W] to [batch, classes]
// and reports its KL term through the Classifier trait.

pub mod mc_3conv3fc;
pub mod mc_alexnet;
pub mod vi_3conv3fc;
pub mod vi_alexnet;

use burn::prelude::*;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::options::{ActivationKind, LayerType, ModelFamily, ModelName};
use crate::domain::priors::PriorConfig;

use mc_3conv3fc::{Mc3Conv3Fc, Mc3Conv3FcConfig};
use mc_alexnet::{McAlexNet, McAlexNetConfig};
use vi_3conv3fc::{Vi3Conv3Fc, Vi3Conv3FcConfig};
use vi_alexnet::{ViAlexNet, ViAlexNetConfig};

/// The forward contract shared by every architecture.
pub trait Classifier<B: Backend>: Module<B> {
    /// Class scores (logits) for a batch of images.
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Summed KL divergence of all variational layers, `None` for
    /// networks without learned weight distributions.
    fn kl_loss(&self) -> Option<Tensor<B, 1>>;
}

// ─── Network ──────────────────────────────────────────────────────────────────
/// A constructed model of any supported architecture.
#[derive(Debug)]
pub enum Network<B: Backend> {
    McDrop3Conv3Fc(Mc3Conv3Fc<B>),
    VarInf3Conv3Fc(Vi3Conv3Fc<B>),
    McDropAlexNet(McAlexNet<B>),
    VarInfAlexNet(ViAlexNet<B>),
}

/// Run `$body` with `$model` bound to the concrete architecture inside
/// `$network`. Each arm is type-checked on its own, so generic code
/// (training, checkpoints) sees the real module type.
macro_rules! with_network {
    ($network:expr, $model:ident => $body:expr) => {
        match $network {
            $crate::ml::models::Network::McDrop3Conv3Fc($model) => $body,
            $crate::ml::models::Network::VarInf3Conv3Fc($model) => $body,
            $crate::ml::models::Network::McDropAlexNet($model)  => $body,
            $crate::ml::models::Network::VarInfAlexNet($model)  => $body,
        }
    };
}
pub(crate) use with_network;

impl<B: Backend> Network<B> {
    pub fn name(&self) -> ModelName {
        match self {
            Self::McDrop3Conv3Fc(_) => ModelName::McDrop3Conv3Fc,
            Self::VarInf3Conv3Fc(_) => ModelName::VarInf3Conv3Fc,
            Self::McDropAlexNet(_)  => ModelName::McDropAlexNet,
            Self::VarInfAlexNet(_)  => ModelName::VarInfAlexNet,
        }
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        with_network!(self, m => m.forward(images))
    }

    pub fn kl_loss(&self) -> Option<Tensor<B, 1>> {
        with_network!(self, m => m.kl_loss())
    }

    pub fn num_params(&self) -> usize {
        with_network!(self, m => m.num_params())
    }
}

// ─── Factory ──────────────────────────────────────────────────────────────────
/// Raw (string) model options, as they arrive from the run config.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub model:          String,
    pub input_channels: usize,
    pub num_classes:    usize,
    pub activation:     String,
    /// Only read by MC dropout models
    pub dropout:        f64,
    /// Only read by variational models
    pub priors:         PriorConfig,
    /// Only read by variational models
    pub layer_type:     String,
}

/// Build the network named in `opts`.
pub fn load_model<B: Backend>(opts: &ModelOptions, device: &B::Device) -> PipelineResult<Network<B>> {
    let model: ModelName          = opts.model.parse()?;
    let activation: ActivationKind = opts.activation.parse()?;

    if opts.input_channels == 0 || opts.num_classes == 0 {
        return Err(PipelineError::InvalidOption(format!(
            "input channels ({}) and classes ({}) must both be positive",
            opts.input_channels, opts.num_classes
        )));
    }

    let network = match model.family() {
        ModelFamily::McDropout => {
            if !(0.0..1.0).contains(&opts.dropout) {
                return Err(PipelineError::InvalidOption(format!(
                    "dropout must be in [0, 1), got {}",
                    opts.dropout
                )));
            }
            match model {
                ModelName::McDrop3Conv3Fc => Network::McDrop3Conv3Fc(
                    Mc3Conv3FcConfig::new(opts.num_classes, opts.input_channels, opts.dropout, activation)
                        .init(device),
                ),
                _ => Network::McDropAlexNet(
                    McAlexNetConfig::new(opts.num_classes, opts.input_channels, opts.dropout, activation)
                        .init(device),
                ),
            }
        }
        ModelFamily::VariationalInference => {
            let layer_type: LayerType = opts.layer_type.parse()?;
            if !opts.priors.is_valid() {
                return Err(PipelineError::InvalidOption(format!("invalid priors: {:?}", opts.priors)));
            }
            let priors = opts.priors.clone();
            match model {
                ModelName::VarInf3Conv3Fc => Network::VarInf3Conv3Fc(
                    Vi3Conv3FcConfig::new(opts.num_classes, opts.input_channels, priors, layer_type, activation)
                        .init(device),
                ),
                _ => Network::VarInfAlexNet(
                    ViAlexNetConfig::new(opts.num_classes, opts.input_channels, priors, layer_type, activation)
                        .init(device),
                ),
            }
        }
    };

    tracing::info!(
        "Built {} ({} parameters, activation {})",
        network.name(),
        network.num_params(),
        activation
    );
    Ok(network)
}
