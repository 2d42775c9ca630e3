// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop shared by all four architectures.
//
// Per epoch:
//   1. train phase — forward, loss (CE or ELBO), backward,
//                    Adam step at the scheduler's current lr
//   2. val phase   — forward only, on model.valid()
//   3. plateau scheduler steps on the mean validation loss
//   4. summary line → log.txt (and stdout)
//   5. checkpoint   iff val accuracy beats every earlier epoch
//
// Key Burn 0.20 insight:
//   - Training runs on B (Autodiff<...>) for gradients
//   - model.valid() returns the module on B::InnerBackend
//   - Validation batches come from the same loader type, so they
//     are moved to the inner backend with .inner()
//   - argmax(1) returns [batch,1]; flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::time::Instant;

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::ImageBatch, loader::PhaseLoaders};
use crate::domain::options::{BetaType, Phase};
use crate::infra::{
    checkpoint::{BestModelInfo, BestTracker, CheckpointManager},
    metrics::{EpochMetrics, PhaseAccumulator, ScalarWriter},
    run_log::RunLog,
};
use crate::ml::{
    loss::{classification_loss, BetaSchedule},
    models::Classifier,
    scheduler::{PlateauConfig, ReduceLrOnPlateau},
};

/// Loop settings that are not part of the model or the data.
#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub epochs:               usize,
    pub lr:                   f64,
    pub beta:                 BetaType,
    pub suppress_epoch_print: bool,
}

/// Where the loop writes its outputs.
pub struct RunOutputs<'a> {
    pub checkpoints: &'a CheckpointManager,
    pub log:         &'a RunLog,
    pub scalars:     &'a mut ScalarWriter,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    /// None only when no epoch ran
    pub best:    Option<BestModelInfo>,
    pub history: Vec<EpochMetrics>,
}

/// Train `model` on the train/val loaders for `settings.epochs` epochs.
pub fn train<B, M>(
    mut model: M,
    loaders:   &PhaseLoaders<B>,
    settings:  &TrainSettings,
    mut out:   RunOutputs<'_>,
) -> Result<TrainSummary>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
{
    let train_loader = loaders.phase(Phase::Train)?;
    let val_loader   = loaders.phase(Phase::Val)?;
    let n_train      = train_loader.num_items().max(1) as f64;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim     = AdamConfig::new().with_epsilon(1e-8).init();
    let mut scheduler = ReduceLrOnPlateau::new(settings.lr, PlateauConfig::default());
    let beta          = BetaSchedule::new(settings.beta);
    let mut tracker   = BestTracker::default();
    let mut history   = Vec::with_capacity(settings.epochs);

    let mut train_step = 0usize;
    let mut val_step   = 0usize;

    tracing::info!(
        "Training for {} epochs: {} train / {} val samples, lr {}",
        settings.epochs,
        train_loader.num_items(),
        val_loader.num_items(),
        settings.lr,
    );

    for epoch in 1..=settings.epochs {
        let started = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_acc   = PhaseAccumulator::default();
        let num_batches     = train_loader.num_batches();

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let n         = batch.len();
            let kl_weight = beta.beta(batch_idx, num_batches, epoch, settings.epochs) / n_train;

            let scores = model.forward(batch.images);
            let loss   = classification_loss(scores.clone(), batch.targets.clone(), model.kl_loss(), kl_weight);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_acc.add(loss_val, count_correct(scores, batch.targets), n);

            train_step += 1;
            out.scalars.add_scalar("Loss_iter/train", train_step, loss_val)?;
            tracing::debug!("[train] epoch {} batch {}/{} loss {:.4}", epoch, batch_idx + 1, num_batches, loss_val);

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model     = optim.step(scheduler.lr(), model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → same architecture on B::InnerBackend.
        // Dropout masks and weight sampling stay active.
        let model_valid    = model.valid();
        let mut val_acc    = PhaseAccumulator::default();
        let num_batches    = val_loader.num_batches();

        for (batch_idx, batch) in val_loader.iter().enumerate() {
            let batch = ImageBatch::<B::InnerBackend> {
                images:  batch.images.inner(),
                targets: batch.targets.inner(),
            };
            let n         = batch.len();
            let kl_weight = beta.beta(batch_idx, num_batches, epoch, settings.epochs) / n_train;

            let scores = model_valid.forward(batch.images);
            let loss   = classification_loss(scores.clone(), batch.targets.clone(), model_valid.kl_loss(), kl_weight);

            let loss_val: f64 = loss.into_scalar().elem::<f64>();
            val_acc.add(loss_val, count_correct(scores, batch.targets), n);

            val_step += 1;
            out.scalars.add_scalar("Loss_iter/val", val_step, loss_val)?;
            tracing::debug!("[val] epoch {} batch {}/{} loss {:.4}", epoch, batch_idx + 1, num_batches, loss_val);
        }

        // ── End of epoch ──────────────────────────────────────────────────────
        let metrics = EpochMetrics {
            epoch,
            train_loss: train_acc.mean_loss(),
            train_acc:  train_acc.accuracy(),
            val_loss:   val_acc.mean_loss(),
            val_acc:    val_acc.accuracy(),
            seconds:    started.elapsed().as_secs_f64(),
        };

        out.scalars.add_scalar("Loss_epoch/train", epoch, metrics.train_loss)?;
        out.scalars.add_scalar("Accuracy_epoch/train", epoch, metrics.train_acc)?;
        out.scalars.add_scalar("Loss_epoch/val", epoch, metrics.val_loss)?;
        out.scalars.add_scalar("Accuracy_epoch/val", epoch, metrics.val_acc)?;

        let lr = scheduler.step(metrics.val_loss);
        out.scalars.add_scalar("Learning_rate", epoch, lr)?;
        out.scalars.flush()?;

        let line = metrics.summary_line();
        out.log.append(&line)?;
        if !settings.suppress_epoch_print {
            println!("{line}");
        }

        if tracker.offer(epoch, metrics.val_acc) {
            let info = BestModelInfo { epoch, accuracy: metrics.val_acc };
            out.checkpoints.save_best(&model, &optim, &info)?;
            tracing::info!("New best validation accuracy {:.2}% at epoch {}", info.accuracy, epoch);
        }

        history.push(metrics);
    }

    let best = tracker.best().cloned();
    if let Some(best) = &best {
        let line = format!(
            "--- Best validation accuracy is {:.1}% obtained at epoch {} ---",
            best.accuracy, best.epoch
        );
        out.log.append(&line)?;
        println!("{line}");
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary { best, history })
}

/// Number of rows whose highest score is the target class
pub fn count_correct<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let hits: i64 = scores
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    hits as usize
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::PathBuf};

    use burn::backend::{Autodiff, NdArray};

    use crate::data::loader::{build_loaders, tests::{options, synthetic_mnist}};
    use crate::domain::options::{ActivationKind, DatasetName, LayerType, RunMode};
    use crate::domain::priors::PriorConfig;
    use crate::ml::models::mc_3conv3fc::Mc3Conv3FcConfig;
    use crate::ml::models::vi_3conv3fc::Vi3Conv3FcConfig;

    type TrainBackend = Autodiff<NdArray>;

    fn settings(epochs: usize) -> TrainSettings {
        TrainSettings {
            epochs,
            lr:                   1e-3,
            beta:                 BetaType::Fixed(0.1),
            suppress_epoch_print: true,
        }
    }

    #[test]
    fn test_count_correct() {
        let device  = Default::default();
        let scores  = Tensor::<NdArray, 2>::from_floats([[0.9, 0.1], [0.2, 0.8], [0.7, 0.3]], &device);
        let targets = Tensor::<NdArray, 1, Int>::from_ints([0, 1, 1], &device);
        assert_eq!(count_correct(scores, targets), 2);
    }

    #[test]
    fn test_two_epochs_write_log_scalars_and_one_checkpoint() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let loaders = build_loaders::<TrainBackend>(
            DatasetName::Mnist, RunMode::Train, synthetic_mnist(20), &options(PathBuf::new()), &device,
        )
        .unwrap();

        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let log         = RunLog::create(dir.path(), "bayes-cnn train").unwrap();
        let mut scalars = ScalarWriter::create(dir.path()).unwrap();

        let model   = Mc3Conv3FcConfig::new(10, 1, 0.5, ActivationKind::Relu).init::<TrainBackend>(&device);
        let summary = train(
            model,
            &loaders,
            &settings(2),
            RunOutputs { checkpoints: &checkpoints, log: &log, scalars: &mut scalars },
        )
        .unwrap();

        assert_eq!(summary.history.len(), 2);
        let best = summary.best.unwrap();
        let max_acc = summary.history.iter().map(|m| m.val_acc).fold(f64::MIN, f64::max);
        assert_eq!(best.accuracy, max_acc);
        assert_eq!(checkpoints.best_info().unwrap(), best);

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("Epoch:")).count(), 2);
        assert!(text.lines().last().unwrap().starts_with("--- Best validation accuracy is"));

        let csv = fs::read_to_string(scalars.csv_path()).unwrap();
        // 16 train samples / batch 8 → 2 iterations per epoch
        assert_eq!(csv.lines().filter(|l| l.starts_with("Loss_iter/train,")).count(), 4);
        assert_eq!(csv.lines().filter(|l| l.starts_with("Accuracy_epoch/val,")).count(), 2);
    }

    #[test]
    fn test_running_time_is_per_epoch() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let loaders = build_loaders::<TrainBackend>(
            DatasetName::Mnist, RunMode::Train, synthetic_mnist(20), &options(PathBuf::new()), &device,
        )
        .unwrap();

        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let log         = RunLog::create(dir.path(), "bayes-cnn train").unwrap();
        let mut scalars = ScalarWriter::create(dir.path()).unwrap();
        let model       = Mc3Conv3FcConfig::new(10, 1, 0.5, ActivationKind::Relu).init::<TrainBackend>(&device);

        let started = Instant::now();
        let summary = train(
            model,
            &loaders,
            &settings(3),
            RunOutputs { checkpoints: &checkpoints, log: &log, scalars: &mut scalars },
        )
        .unwrap();
        let total = started.elapsed().as_secs_f64();

        // Cumulative timings would add up to roughly twice the whole call
        let reported: f64 = summary.history.iter().map(|m| m.seconds).sum();
        assert!(reported <= total, "epochs report {reported}s, call took {total}s");
        assert!(summary.history.iter().all(|m| m.seconds > 0.0));
    }

    #[test]
    fn test_variational_model_trains() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let loaders = build_loaders::<TrainBackend>(
            DatasetName::Mnist, RunMode::Train, synthetic_mnist(10), &options(PathBuf::new()), &device,
        )
        .unwrap();

        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let log         = RunLog::create(dir.path(), "bayes-cnn train").unwrap();
        let mut scalars = ScalarWriter::create(dir.path()).unwrap();

        let model = Vi3Conv3FcConfig::new(10, 1, PriorConfig::default(), LayerType::Lrt, ActivationKind::Softplus)
            .init::<TrainBackend>(&device);
        let summary = train(
            model,
            &loaders,
            &TrainSettings { beta: BetaType::Blundell, ..settings(1) },
            RunOutputs { checkpoints: &checkpoints, log: &log, scalars: &mut scalars },
        )
        .unwrap();

        let metrics = &summary.history[0];
        assert!(metrics.train_loss.is_finite() && metrics.train_loss > 0.0);
        assert!(metrics.val_loss.is_finite());
        assert!(summary.best.is_some());
    }

    #[test]
    fn test_test_mode_loaders_are_rejected() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let loaders = build_loaders::<TrainBackend>(
            DatasetName::Mnist, RunMode::Test, synthetic_mnist(4), &options(PathBuf::new()), &device,
        )
        .unwrap();

        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let log         = RunLog::create(dir.path(), "bayes-cnn train").unwrap();
        let mut scalars = ScalarWriter::create(dir.path()).unwrap();
        let model       = Mc3Conv3FcConfig::new(10, 1, 0.5, ActivationKind::Relu).init::<TrainBackend>(&device);

        let res = train(
            model,
            &loaders,
            &settings(1),
            RunOutputs { checkpoints: &checkpoints, log: &log, scalars: &mut scalars },
        );
        assert!(res.is_err());
    }
}
