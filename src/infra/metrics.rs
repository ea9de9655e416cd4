// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics after each epoch, in two shapes:
//
//   history/<...>/trial-<n>.csv   one row per epoch
//   history/<...>/trial-<n>.json  one list per metric, the shape
//                                 Keras' History.history has, so
//                                 existing plotting notebooks load it
//
// Example CSV output:
//   epoch,loss,auroc,aupr,val_loss,val_auroc,val_aupr,lr
//   1,0.412300,0.701200,0.356100,0.398700,0.722000,0.381000,0.000500
//   2,0.377100,0.765400,0.440200,0.371200,0.781300,0.463300,0.000500
//
// A rerun of the same trial overwrites both files.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "epoch,loss,auroc,aupr,val_loss,val_auroc,val_aupr,lr";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean binary cross-entropy over the training batches
    pub train_loss:  f64,
    pub train_auroc: f64,
    pub train_aupr:  f64,

    pub val_loss:  f64,
    pub val_auroc: f64,
    pub val_aupr:  f64,

    /// Learning rate the epoch was trained with
    pub lr: f64,
}

/// Per-metric lists, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss:      Vec<f64>,
    pub auroc:     Vec<f64>,
    pub aupr:      Vec<f64>,
    pub val_loss:  Vec<f64>,
    pub val_auroc: Vec<f64>,
    pub val_aupr:  Vec<f64>,
    pub lr:        Vec<f64>,
}

impl TrainingHistory {
    pub fn push(&mut self, m: &EpochMetrics) {
        self.loss.push(m.train_loss);
        self.auroc.push(m.train_auroc);
        self.aupr.push(m.train_aupr);
        self.val_loss.push(m.val_loss);
        self.val_auroc.push(m.val_auroc);
        self.val_aupr.push(m.val_aupr);
        self.lr.push(m.lr);
    }

    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write history to '{}'", path.display()))?;
        tracing::debug!("Saved training history to '{}'", path.display());
        Ok(())
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the CSV file (truncating any previous run) and write the header.
    pub fn new(csv_path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = csv_path.into();
        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create metrics CSV '{}'", csv_path.display()))?;
        writeln!(f, "{CSV_HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6e}",
            m.epoch,
            m.train_loss,
            m.train_auroc,
            m.train_aupr,
            m.val_loss,
            m.val_auroc,
            m.val_aupr,
            m.lr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: loss={:.4}, val_aupr={:.4}",
            m.epoch,
            m.train_loss,
            m.val_aupr,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, val_aupr: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss:  0.5,
            train_auroc: 0.7,
            train_aupr:  0.4,
            val_loss:    0.6,
            val_auroc:   0.65,
            val_aupr,
            lr:          5e-4,
        }
    }

    #[test]
    fn test_history_collects_lists() {
        let mut h = TrainingHistory::default();
        h.push(&metrics(1, 0.3));
        h.push(&metrics(2, f64::NAN));
        h.push(&metrics(3, 0.5));
        assert_eq!(h.epochs(), 3);
        assert_eq!(h.lr, vec![5e-4; 3]);
        assert!(h.val_aupr[1].is_nan());
        assert_eq!(h.val_aupr[2], 0.5);
    }

    #[test]
    fn test_history_json_has_keras_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("trial-0.json");
        let mut h = TrainingHistory::default();
        h.push(&metrics(1, 0.3));
        h.save_json(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in ["loss", "auroc", "aupr", "val_loss", "val_auroc", "val_aupr", "lr"] {
            assert!(value[key].is_array(), "missing {key}");
        }
        assert_eq!(value["val_aupr"][0], 0.3);
    }

    #[test]
    fn test_csv_rows_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trial-0.csv");

        let logger = MetricsLogger::new(&path).unwrap();
        logger.log(&metrics(1, 0.3)).unwrap();
        logger.log(&metrics(2, 0.4)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);

        // a rerun starts from an empty log
        let logger = MetricsLogger::new(&path).unwrap();
        logger.log(&metrics(1, 0.3)).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.lines().next(), Some(CSV_HEADER));
    }
}
