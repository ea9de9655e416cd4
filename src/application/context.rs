// ============================================================
// Layer 2 — Pipeline Context
// ============================================================
// What every trial of a run shares: the dataset, loaded once
// and held read-only behind an Arc, and the output layout of
// the (category, variant) group being run.
//
// Training a trial is the same for both pipelines, so it lives
// here:
//
//   Step 1: Create the trial's output directories  (Layer 6 - infra)
//   Step 2: Size the network for the dataset       (Layer 5 - ml)
//   Step 3: Train with the trial seed              (Layer 5 - ml)
//   Step 4: Save weights, configs and history      (Layer 6 - infra)

use std::sync::Arc;

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;

use crate::application::config::RunConfig;
use crate::domain::genomic::GenomicDataset;
use crate::domain::traits::DatasetSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    layout::{OutputLayout, TrialPaths},
    metrics::MetricsLogger,
};
use crate::ml::trainer::{run_training, TrainingOutcome};

pub struct PipelineContext {
    pub dataset: Arc<GenomicDataset>,
    pub layout:  OutputLayout,
}

/// A trained trial, ready for analysis.
pub struct TrainedTrial<B: AutodiffBackend> {
    pub identifier: String,
    pub paths:      TrialPaths,
    pub batch_size: usize,
    pub outcome:    TrainingOutcome<B>,
}

impl PipelineContext {
    pub fn new(dataset: Arc<GenomicDataset>, layout: OutputLayout) -> Self {
        Self { dataset, layout }
    }

    /// Load the dataset once; every trial of the run reuses it.
    pub fn load(source: &dyn DatasetSource, layout: OutputLayout) -> Result<Self> {
        let dataset = source.load()?;
        Ok(Self::new(Arc::new(dataset), layout))
    }

    /// `<variant>--trial-<n>`, the name a trial's record carries.
    pub fn identifier(&self, trial: usize) -> String {
        format!("{}--trial-{trial}", self.layout.variant())
    }

    pub fn train_trial<B: AutodiffBackend>(
        &self,
        run:    &RunConfig,
        trial:  usize,
        device: &B::Device,
    ) -> Result<TrainedTrial<B>> {
        let identifier = self.identifier(trial);

        // ── Step 1: Output directories ────────────────────────────────────────
        let paths = self.layout.prepare_trial(trial)?;

        // ── Step 2: Network and training settings ─────────────────────────────
        let model_cfg = run.model_config(&self.dataset);
        let training  = run.trial_training(trial);
        tracing::info!(
            "[{identifier}] training {:?} for up to {} epochs (seed {})",
            run.architecture, training.epochs, training.seed,
        );

        // ── Step 3 + 4: Train and persist ─────────────────────────────────────
        let checkpoint = CheckpointManager::new(&paths.weights);
        let logger     = MetricsLogger::new(&paths.history_csv)?;
        let outcome = run_training::<B>(
            &model_cfg,
            &training,
            self.dataset.clone(),
            device,
            &checkpoint,
            Some(&logger),
        )?;
        outcome.history.save_json(&paths.history)?;

        Ok(TrainedTrial {
            identifier,
            paths,
            batch_size: training.batch_size,
            outcome,
        })
    }
}
