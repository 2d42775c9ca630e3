// ============================================================
// Layer 6 — Run Log
// ============================================================
// log.txt of a run directory: the command line that started the
// run, one summary line per epoch and the final best-accuracy
// line. Every line is appended as soon as it is produced, so an
// interrupted run keeps everything up to its last epoch.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Create (or truncate) `dir/log.txt` and write the command line.
    pub fn create(dir: &Path, command_line: &str) -> Result<Self> {
        let path = dir.join("log.txt");
        fs::write(&path, format!("{command_line}\n"))
            .with_context(|| format!("Cannot create run log '{}'", path.display()))?;
        Ok(Self { path })
    }

    pub fn append(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open run log '{}'", self.path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_then_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), "bayes-cnn train --epochs 1").unwrap();
        log.append("Epoch:   1 |...").unwrap();
        log.append("--- done ---").unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "bayes-cnn train --epochs 1\nEpoch:   1 |...\n--- done ---\n");
    }
}
