// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Hyperparameters of each pipeline stage. Serialisable so a
// trial's settings are saved next to its weights and can be
// read back when the model is reloaded.

use serde::{Deserialize, Serialize};

use crate::analysis::interpretability::{DEFAULT_INFO_THRESHOLD, DEFAULT_TOP_K};
use crate::analysis::motif_match::DEFAULT_Q_THRESHOLD;
use crate::domain::genomic::GenomicDataset;
use crate::ml::model::{Architecture, ArchitectureParams, MotifNetConfig};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub seed:           u64,
    pub early_stopping: bool,
    pub stop_patience:  usize,
    pub lr_patience:    usize,
    pub lr_factor:      f64,
    pub min_lr:         f64,
    pub min_delta:      f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs:         75,
            batch_size:     100,
            lr:             5e-4,
            seed:           0,
            early_stopping: true,
            stop_patience:  15,
            lr_patience:    5,
            lr_factor:      0.2,
            min_lr:         1e-7,
            min_delta:      1e-4,
        }
    }
}

// ─── Filter Extraction ───────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Width of the sequence window aligned on each activation
    pub window:      usize,
    /// Fraction of a filter's maximum activation a position must exceed
    pub threshold:   f64,
    /// Minimum row information kept when clipping, in bits
    pub clip_threshold: f64,
    /// Rows kept on either side of the informative core
    pub pad:         usize,
    /// Tomtom q-value cut-off for a significant match
    pub q_threshold: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            window:         20,
            threshold:      0.5,
            clip_threshold: 0.5,
            pad:            3,
            q_threshold:    DEFAULT_Q_THRESHOLD,
        }
    }
}

// ─── Saliency Analysis ───────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaliencyConfig {
    /// Output class whose score is attributed
    pub class_index:    usize,
    /// Upper bound on explained positive test sequences
    pub num_analyze:    usize,
    /// Ground-truth information marking motif positions, in bits
    pub info_threshold: f64,
    /// Background scores averaged into the noise level
    pub top_k:          usize,
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        Self {
            class_index:    0,
            num_analyze:    500,
            info_threshold: DEFAULT_INFO_THRESHOLD,
            top_k:          DEFAULT_TOP_K,
        }
    }
}

// ─── Run Configuration ───────────────────────────────────────────────────────
// One (category, variant) group: which network, how it is trained,
// and how many independently seeded trials to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub architecture: Architecture,
    pub params:       ArchitectureParams,
    pub training:     TrainingConfig,
    pub trials:       usize,
    pub base_seed:    u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::Cnn,
            params:       ArchitectureParams::default(),
            training:     TrainingConfig::default(),
            trials:       5,
            base_seed:    0,
        }
    }
}

impl RunConfig {
    /// Training settings of trial `n`: seeded with `base_seed + n`.
    pub fn trial_training(&self, n: usize) -> TrainingConfig {
        TrainingConfig {
            seed: self.base_seed + n as u64,
            ..self.training.clone()
        }
    }

    /// Network sized for the dataset's sequence length and class count.
    pub fn model_config(&self, dataset: &GenomicDataset) -> MotifNetConfig {
        let params = ArchitectureParams {
            num_out: dataset.num_classes(),
            ..self.params.clone()
        };
        self.architecture.config(dataset.seq_len(), &params)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::toy_dataset;

    #[test]
    fn test_trial_seed_offsets_base_seed() {
        let run = RunConfig { base_seed: 40, ..RunConfig::default() };
        assert_eq!(run.trial_training(0).seed, 40);
        assert_eq!(run.trial_training(3).seed, 43);
        assert_eq!(run.trial_training(3).epochs, run.training.epochs);
    }

    #[test]
    fn test_model_config_follows_dataset_shape() {
        let dataset = toy_dataset(10, 60, 3, 0);
        let cfg = RunConfig::default().model_config(&dataset);
        assert_eq!(cfg.seq_len, 60);
        assert_eq!(cfg.num_out, 3);
    }
}
