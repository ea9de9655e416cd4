// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves the weights of one trial's model using Burn's
// CompactRecorder.
//
// What gets saved per trial, next to each other:
//   1. <stem>.mpk        — all learned parameters
//   2. <stem>.model.json — MotifNetConfig (the architecture)
//   3. <stem>.train.json — TrainingConfig (how it was trained)
//
// The architecture must be known to rebuild the model before
// the weights can be loaded into it (MotifNetConfig::load, then
// CompactRecorder::load), so the config travels with the weights.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Stores floats at half precision
//   - Type-safe: loading fails if architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::config::TrainingConfig;
use crate::ml::model::{MotifNet, MotifNetConfig};

/// Manages the weight and config files of one trial.
pub struct CheckpointManager {
    /// Path of the weights file without extension
    stem: PathBuf,
}

impl CheckpointManager {
    /// `stem` is the weights path without extension; the recorder adds it.
    pub fn new(stem: impl Into<PathBuf>) -> Self {
        Self { stem: stem.into() }
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .stem
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.stem.with_file_name(name)
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.stem.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        Ok(())
    }

    /// Save model weights. Overwrites a previous save of the same trial.
    pub fn save_model<B: Backend>(&self, model: &MotifNet<B>) -> Result<()> {
        self.ensure_parent()?;
        CompactRecorder::new()
            .record(model.clone().into_record(), self.stem.clone())
            .with_context(|| {
                format!("Failed to save weights to '{}'", self.stem.display())
            })?;

        tracing::debug!("Saved weights: '{}'", self.stem.display());
        Ok(())
    }

    /// Write both configs next to the weights.
    pub fn save_config(&self, model_cfg: &MotifNetConfig, train_cfg: &TrainingConfig) -> Result<()> {
        self.ensure_parent()?;

        let model_path = self.sibling(".model.json");
        model_cfg
            .save(&model_path)
            .with_context(|| format!("Cannot write config to '{}'", model_path.display()))?;

        let train_path = self.sibling(".train.json");
        fs::write(&train_path, serde_json::to_string_pretty(train_cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", train_path.display()))?;

        tracing::debug!("Saved configs next to '{}'", self.stem.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::{Architecture, ArchitectureParams};
    use crate::ml::BACKEND_LOCK;

    #[test]
    fn test_save_writes_weights_and_configs() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("models").join("trial-0"));
        let device = Default::default();

        let params = ArchitectureParams { num_filters: 4, dense_units: 8, num_out: 2, ..Default::default() };
        let cfg = Architecture::Cnn.config(24, &params);
        let model: MotifNet<NdArray> = cfg.init(&device);

        manager.save_config(&cfg, &TrainingConfig::default()).unwrap();
        manager.save_model(&model).unwrap();

        let models = dir.path().join("models");
        assert!(models.join("trial-0.mpk").exists());
        assert!(models.join("trial-0.train.json").exists());

        // the architecture written next to the weights is the one trained
        let saved = MotifNetConfig::load(models.join("trial-0.model.json")).unwrap();
        assert_eq!(saved.seq_len, cfg.seq_len);
        assert_eq!(saved.num_filters, cfg.num_filters);
    }
}
