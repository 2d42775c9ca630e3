// ============================================================
// Layer 5 — Classification Loss and KL Weighting
// ============================================================
// MC dropout networks minimise plain cross-entropy. Variational
// networks minimise the negative ELBO:
//
//   loss = CE(scores, targets) + β · KL / n_train
//
// β weights the KL term per minibatch. With m minibatches in the
// phase and i the 0-based batch index:
//
//   blundell   2^(m-i-1) / (2^m - 1)      front-loads the prior
//   soenderby  min(epoch / max(E/4, 1), 1) linear warm-up
//   standard   1 / m
//   none       0
//   <number>   constant
//
// Reference: Blundell et al. (2015) Weight Uncertainty in Neural Networks
//            Sønderby et al. (2016) Ladder Variational Autoencoders

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*};

use crate::domain::options::BetaType;

/// Per-minibatch KL weight.
#[derive(Debug, Clone, Copy)]
pub struct BetaSchedule {
    kind: BetaType,
}

impl BetaSchedule {
    pub fn new(kind: BetaType) -> Self {
        Self { kind }
    }

    /// `batch_idx` is 0-based, `epoch` is 1-based.
    pub fn beta(&self, batch_idx: usize, num_batches: usize, epoch: usize, epochs: usize) -> f64 {
        match self.kind {
            BetaType::Blundell => {
                // 2^(m-i-1) / (2^m - 1) rewritten so large m never overflows
                let m = num_batches.max(1) as f64;
                let i = batch_idx as f64;
                2f64.powf(-(i + 1.0)) / (1.0 - 2f64.powf(-m))
            }
            BetaType::Soenderby => {
                let warmup = (epochs / 4).max(1) as f64;
                (epoch as f64 / warmup).min(1.0)
            }
            BetaType::Standard => 1.0 / num_batches.max(1) as f64,
            BetaType::None     => 0.0,
            BetaType::Fixed(b) => b,
        }
    }
}

/// Mean cross-entropy over the batch plus `kl_weight · KL` when the
/// network has a KL term. `kl_weight` is β / n_train.
pub fn classification_loss<B: Backend>(
    scores:    Tensor<B, 2>,
    targets:   Tensor<B, 1, Int>,
    kl:        Option<Tensor<B, 1>>,
    kl_weight: f64,
) -> Tensor<B, 1> {
    let ce = CrossEntropyLossConfig::new()
        .init(&scores.device())
        .forward(scores, targets);

    match kl {
        Some(kl) if kl_weight > 0.0 => ce + kl.mul_scalar(kl_weight),
        _ => ce,
    }
}
