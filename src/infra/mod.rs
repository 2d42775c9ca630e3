// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a run leaves on disk:
//
//   run_dir.rs    — Run directory naming
//                   <results>/<mcdrop|varinf>/model-...-batchsize-N
//                   and the working-directory guard
//
//   run_log.rs    — log.txt: command line, one summary line per
//                   epoch, best validation accuracy
//
//   metrics.rs    — Epoch summaries, per-phase accumulators and
//                   the scalars.csv writer
//
//   checkpoint.rs — Best checkpoint (weights, optimizer state,
//                   epoch/accuracy) and train_config.json
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Best model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics and scalar logging
pub mod metrics;

/// Text log of a run
pub mod run_log;

/// Run directory layout and base directory check
pub mod run_dir;
