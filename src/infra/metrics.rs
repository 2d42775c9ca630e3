// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two kinds of records come out of a training run:
//
//   EpochMetrics  — mean loss and accuracy of both phases of one
//                   epoch; rendered as the summary line of log.txt
//
//   scalars.csv   — every scalar the loop emits, one row each:
//                     tag,step,value
//                     Loss_iter/train,1,2.301234
//                     Loss_epoch/val,1,2.287100
//                     Accuracy_epoch/val,1,11.250000
//
// Mean loss is Σ(batch_loss × batch_size) / n_items, so a short
// last batch is weighted correctly. Accuracy is in percent.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Mean loss and accuracy of both phases of a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch:      usize,
    pub train_loss: f64,
    /// Percent of training samples classified correctly
    pub train_acc:  f64,
    pub val_loss:   f64,
    /// Percent of validation samples classified correctly
    pub val_acc:    f64,
    /// Wall-clock time of this epoch alone
    pub seconds:    f64,
}

impl EpochMetrics {
    /// The per-epoch line written to log.txt and stdout
    pub fn summary_line(&self) -> String {
        format!(
            "Epoch: {:>3} |[train]  Loss: {:.4}  Accuracy: {:.1}%  \
             |[val]  Loss: {:.4}  Accuracy: {:.1}%  |Running time: {:.1}s",
            self.epoch,
            self.train_loss,
            self.train_acc,
            self.val_loss,
            self.val_acc,
            self.seconds,
        )
    }
}

// ─── PhaseAccumulator ─────────────────────────────────────────────────────────
/// Running sums over the batches of one phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseAccumulator {
    loss_sum: f64,
    correct:  usize,
    items:    usize,
}

impl PhaseAccumulator {
    /// Add one batch: its mean loss, number of hits and size.
    pub fn add(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct  += correct;
        self.items    += batch_size;
    }

    pub fn mean_loss(&self) -> f64 {
        if self.items == 0 { 0.0 } else { self.loss_sum / self.items as f64 }
    }

    /// Percent correct
    pub fn accuracy(&self) -> f64 {
        if self.items == 0 { 0.0 } else { self.correct as f64 / self.items as f64 * 100.0 }
    }
}

// ─── ScalarWriter ─────────────────────────────────────────────────────────────
/// Appends `tag,step,value` rows to `scalars.csv`.
pub struct ScalarWriter {
    csv_path: PathBuf,
    out:      BufWriter<File>,
}

impl ScalarWriter {
    /// Start a fresh scalars.csv in `dir`, replacing any previous one.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("scalars.csv");
        let file     = File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;

        let mut out = BufWriter::new(file);
        writeln!(out, "tag,step,value")?;
        tracing::debug!("Created scalar log: '{}'", csv_path.display());

        Ok(Self { csv_path, out })
    }

    pub fn add_scalar(&mut self, tag: &str, step: usize, value: f64) -> Result<()> {
        writeln!(self.out, "{tag},{step},{value:.6}")
            .with_context(|| format!("Cannot write to '{}'", self.csv_path.display()))
    }

    /// Flush buffered rows; called once per epoch.
    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .with_context(|| format!("Cannot flush '{}'", self.csv_path.display()))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_format() {
        let m = EpochMetrics {
            epoch:      1,
            train_loss: 0.12344,
            train_acc:  96.14,
            val_loss:   0.1,
            val_acc:    97.0,
            seconds:    12.34,
        };
        assert_eq!(
            m.summary_line(),
            "Epoch:   1 |[train]  Loss: 0.1234  Accuracy: 96.1%  \
             |[val]  Loss: 0.1000  Accuracy: 97.0%  |Running time: 12.3s"
        );
    }

    #[test]
    fn test_accumulator_weights_by_batch_size() {
        let mut acc = PhaseAccumulator::default();
        acc.add(1.0, 3, 4);
        acc.add(4.0, 1, 1);
        // (1.0 * 4 + 4.0 * 1) / 5
        assert!((acc.mean_loss() - 1.6).abs() < 1e-12);
        assert!((acc.accuracy() - 80.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_accumulator_is_zero() {
        let acc = PhaseAccumulator::default();
        assert_eq!(acc.mean_loss(), 0.0);
        assert_eq!(acc.accuracy(), 0.0);
    }

    #[test]
    fn test_scalar_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ScalarWriter::create(dir.path()).unwrap();
        writer.add_scalar("Loss_iter/train", 1, 2.5).unwrap();
        writer.add_scalar("Accuracy_epoch/val", 1, 50.0).unwrap();
        writer.flush().unwrap();

        let text = fs::read_to_string(writer.csv_path()).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows, vec!["tag,step,value", "Loss_iter/train,1,2.500000", "Accuracy_epoch/val,1,50.000000"]);
    }
}
