// ============================================================
// Layer 5 — Monte Carlo Uncertainty Evaluation
// ============================================================
// Both model families are stochastic at evaluation time (dropout
// masks or sampled weights), so T forward passes over the same
// batch give T different softmax vectors p_1..p_T.
//
//   predictive mean  p̄ = (1/T) Σ p_t
//   prediction       argmax p̄
//   entropy          H = -Σ_c p̄_c ln p̄_c
//   variance         Var_t[p_t,ŷ] of the predicted class ŷ
//
// Reported numbers are averaged over the whole test set.
//
// Reference: Gal & Ghahramani (2016) Dropout as a Bayesian Approximation

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::activation::softmax};
use serde::{Deserialize, Serialize};

use crate::data::loader::PhaseLoader;
use crate::ml::models::Classifier;

const LOG_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncertaintyReport {
    /// Accuracy of the predictive mean, in percent
    pub accuracy:      f64,
    pub mean_entropy:  f64,
    pub mean_variance: f64,
    pub num_samples:   usize,
    pub mc_samples:    usize,
}

/// Run `mc_samples` stochastic passes over every batch of `loader`.
pub fn evaluate<B: Backend, M: Classifier<B>>(
    model:      &M,
    loader:     &PhaseLoader<B>,
    mc_samples: usize,
) -> Result<UncertaintyReport> {
    ensure!(mc_samples > 0, "at least one Monte Carlo sample is required");

    let mut correct      = 0usize;
    let mut total        = 0usize;
    let mut entropy_sum  = 0.0f64;
    let mut variance_sum = 0.0f64;

    for batch in loader.iter() {
        let n = batch.len();

        let mut prob_sum: Option<Tensor<B, 2>> = None;
        let mut sq_sum:   Option<Tensor<B, 2>> = None;
        for _ in 0..mc_samples {
            let probs = softmax(model.forward(batch.images.clone()), 1);
            let sq    = probs.clone().powf_scalar(2.0);
            prob_sum  = Some(match prob_sum { Some(s) => s + probs, None => probs });
            sq_sum    = Some(match sq_sum   { Some(s) => s + sq,    None => sq });
        }
        let (Some(prob_sum), Some(sq_sum)) = (prob_sum, sq_sum) else {
            continue;
        };

        let t        = mc_samples as f64;
        let mean     = prob_sum.div_scalar(t);
        let variance = sq_sum.div_scalar(t) - mean.clone().powf_scalar(2.0);

        let entropy: f64 = mean
            .clone()
            .mul(mean.clone().add_scalar(LOG_EPS).log())
            .sum()
            .neg()
            .into_scalar()
            .elem();

        let predicted = mean.argmax(1);
        let chosen_var: f64 = variance
            .gather(1, predicted.clone())
            .sum()
            .into_scalar()
            .elem();

        let hits: i64 = predicted
            .flatten::<1>(0, 1)
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();

        correct      += hits as usize;
        total        += n;
        entropy_sum  += entropy;
        variance_sum += chosen_var;

        tracing::debug!("Evaluated batch of {} ({} MC passes)", n, mc_samples);
    }

    ensure!(total > 0, "the test loader produced no samples");

    Ok(UncertaintyReport {
        accuracy:      correct as f64 / total as f64 * 100.0,
        mean_entropy:  entropy_sum / total as f64,
        mean_variance: variance_sum / total as f64,
        num_samples:   total,
        mc_samples,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use burn::backend::NdArray;

    use crate::data::loader::{build_loaders, tests::{options, synthetic_mnist}};
    use crate::domain::options::{DatasetName, Phase, RunMode};
    use crate::domain::priors::PriorConfig;
    use crate::ml::models::mc_3conv3fc::Mc3Conv3FcConfig;
    use crate::ml::models::vi_3conv3fc::Vi3Conv3FcConfig;
    use crate::domain::options::{ActivationKind, LayerType};

    type TestBackend = NdArray;

    #[test]
    fn test_report_covers_every_sample() {
        let device  = Default::default();
        let loaders = build_loaders::<TestBackend>(
            DatasetName::Mnist, RunMode::Test, synthetic_mnist(10), &options(PathBuf::new()), &device,
        )
        .unwrap();
        let model = Mc3Conv3FcConfig::new(10, 1, 0.5, ActivationKind::Relu).init::<TestBackend>(&device);

        let report = evaluate(&model, loaders.get(Phase::Test).unwrap(), 3).unwrap();

        assert_eq!(report.num_samples, 10);
        assert_eq!(report.mc_samples, 3);
        assert!((0.0..=100.0).contains(&report.accuracy));
        // entropy of a 10-class distribution lies in [0, ln 10]
        assert!(report.mean_entropy >= 0.0 && report.mean_entropy <= 10f64.ln() + 1e-6);
        assert!(report.mean_variance >= -1e-9);
    }

    #[test]
    fn test_variational_model_is_evaluated_too() {
        let device  = Default::default();
        let loaders = build_loaders::<TestBackend>(
            DatasetName::Mnist, RunMode::Test, synthetic_mnist(4), &options(PathBuf::new()), &device,
        )
        .unwrap();
        let model = Vi3Conv3FcConfig::new(10, 1, PriorConfig::default(), LayerType::Bbb, ActivationKind::Softplus)
            .init::<TestBackend>(&device);

        let report = evaluate(&model, loaders.get(Phase::Test).unwrap(), 2).unwrap();
        assert_eq!(report.num_samples, 4);
    }

    #[test]
    fn test_zero_samples_is_an_error() {
        let device  = Default::default();
        let loaders = build_loaders::<TestBackend>(
            DatasetName::Mnist, RunMode::Test, synthetic_mnist(2), &options(PathBuf::new()), &device,
        )
        .unwrap();
        let model = Mc3Conv3FcConfig::new(10, 1, 0.5, ActivationKind::Relu).init::<TestBackend>(&device);
        assert!(evaluate(&model, loaders.get(Phase::Test).unwrap(), 0).is_err());
    }
}
