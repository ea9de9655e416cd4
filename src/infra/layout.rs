// ============================================================
// Layer 6 — Output Layout
// ============================================================
// Every artefact of a trial lives under one baseline directory:
//
//   <baseline>/
//     models/<category>/<variant>/trial-<n>/weights.mpk  (+ .model.json, .train.json)
//     motifs/<category>/<variant>/trial-<n>.txt          MEME file
//     tomtom/<category>/<variant>/trial-<n>/tomtom.tsv   comparison output
//     stats/<category>/<variant>/trial-<n>.npy           numeric record (+ .json)
//     history/<category>/<variant>/trial-<n>.json        per-metric lists (+ .csv)
//
// Directory creation is idempotent and a rerun overwrites the
// files of the same trial.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct OutputLayout {
    baseline: PathBuf,
    category: String,
    variant:  String,
}

/// Paths of one trial's artefacts.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPaths {
    /// Weights stem; the recorder appends the extension
    pub weights:     PathBuf,
    pub motifs:      PathBuf,
    pub tomtom_dir:  PathBuf,
    pub stats:       PathBuf,
    pub history:     PathBuf,
    pub history_csv: PathBuf,
}

impl OutputLayout {
    pub fn new(baseline: impl Into<PathBuf>, category: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            baseline: baseline.into(),
            category: category.into(),
            variant:  variant.into(),
        }
    }

    pub fn baseline(&self) -> &Path {
        &self.baseline
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    fn group_dir(&self, kind: &str) -> PathBuf {
        self.baseline.join(kind).join(&self.category).join(&self.variant)
    }

    /// Paths for trial `n`, without touching the filesystem.
    pub fn trial(&self, n: usize) -> TrialPaths {
        let trial = format!("trial-{n}");
        TrialPaths {
            weights:     self.group_dir("models").join(&trial).join("weights"),
            motifs:      self.group_dir("motifs").join(format!("{trial}.txt")),
            tomtom_dir:  self.group_dir("tomtom").join(&trial),
            stats:       self.group_dir("stats").join(format!("{trial}.npy")),
            history:     self.group_dir("history").join(format!("{trial}.json")),
            history_csv: self.group_dir("history").join(format!("{trial}.csv")),
        }
    }

    /// Paths for trial `n`, with every parent directory created.
    pub fn prepare_trial(&self, n: usize) -> Result<TrialPaths> {
        let paths = self.trial(n);
        for dir in [
            paths.weights.parent(),
            paths.motifs.parent(),
            Some(paths.tomtom_dir.as_path()),
            paths.stats.parent(),
            paths.history.parent(),
        ]
        .into_iter()
        .flatten()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        }
        Ok(paths)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_paths() {
        let layout = OutputLayout::new("/results", "synthetic", "cnn-att");
        let p = layout.trial(3);
        assert_eq!(p.motifs, PathBuf::from("/results/motifs/synthetic/cnn-att/trial-3.txt"));
        assert_eq!(p.tomtom_dir, PathBuf::from("/results/tomtom/synthetic/cnn-att/trial-3"));
        assert_eq!(p.stats, PathBuf::from("/results/stats/synthetic/cnn-att/trial-3.npy"));
        assert_eq!(p.weights, PathBuf::from("/results/models/synthetic/cnn-att/trial-3/weights"));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "cat", "var");
        let first = layout.prepare_trial(0).unwrap();
        let second = layout.prepare_trial(0).unwrap();
        assert_eq!(first, second);
        assert!(first.tomtom_dir.is_dir());
        assert!(first.weights.parent().unwrap().is_dir());
        assert!(first.history.parent().unwrap().is_dir());
    }
}
