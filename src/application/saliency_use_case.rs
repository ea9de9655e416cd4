// ============================================================
// Layer 2 — SaliencyUseCase
// ============================================================
// Interpretability variant of the pipeline. Needs the coded
// dataset, whose test split comes with the ground-truth
// sequence model (`model_test`) of every sequence.
//
//   Step 1: Train the trial                        (Layer 2 - context)
//   Step 2: Pick positive test sequences           (this file)
//   Step 3: Saliency maps, gradient × input        (Layer 5 - ml)
//   Step 4: Score maps against the ground truth    (Analysis)
//   Step 5: Evaluate on the test split             (Layer 5 - ml)
//   Step 6: Persist the trial record               (Layer 6 - infra)

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use ndarray::Axis;

use crate::analysis::{
    interpretability::{interpretability_performance, signal_noise_stats, snr},
    ranking::mean_defined,
};
use crate::application::config::{RunConfig, SaliencyConfig};
use crate::application::context::PipelineContext;
use crate::data::dataset::SequenceDataset;
use crate::domain::{genomic::{Split, SplitKind}, record::SaliencyTrialRecord};
use crate::infra::stats_store::save_record;
use crate::ml::{
    evaluator::evaluate,
    saliency::{grad_times_input, saliency_maps},
};

pub struct SaliencyUseCase<'a> {
    context:  &'a PipelineContext,
    run:      RunConfig,
    saliency: SaliencyConfig,
}

impl<'a> SaliencyUseCase<'a> {
    pub fn new(context: &'a PipelineContext, run: RunConfig, saliency: SaliencyConfig) -> Self {
        Self { context, run, saliency }
    }

    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<Vec<SaliencyTrialRecord>> {
        // Fail before any training if the dataset cannot be scored
        self.context
            .dataset
            .ground_truth
            .as_ref()
            .context("The saliency pipeline needs a dataset with 'model_test'")?;
        let classes = self.context.dataset.num_classes();
        anyhow::ensure!(
            self.saliency.class_index < classes,
            "class index {} out of range for {classes} classes",
            self.saliency.class_index,
        );

        let mut records = Vec::with_capacity(self.run.trials);
        for trial in 0..self.run.trials {
            let record = self
                .run_trial::<B>(trial, device)
                .with_context(|| format!("Trial {trial} failed"))?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn run_trial<B: AutodiffBackend>(&self, trial: usize, device: &B::Device) -> Result<SaliencyTrialRecord> {
        let dataset = &self.context.dataset;
        let cfg     = &self.saliency;
        let ground_truth = dataset
            .ground_truth
            .as_ref()
            .context("The saliency pipeline needs a dataset with 'model_test'")?;

        // ── Step 1: Train ─────────────────────────────────────────────────────
        let trained = self.context.train_trial::<B>(&self.run, trial, device)?;

        // ── Step 2: Sequences to explain ──────────────────────────────────────
        let test = dataset.split(SplitKind::Test);
        let rows = positive_rows(test, cfg.class_index, cfg.num_analyze);
        let sequences = test.sequences().select(Axis(0), &rows);
        let models    = ground_truth.select(Axis(0), &rows);
        tracing::info!("[{}] explaining {} positive test sequences", trained.identifier, rows.len());

        // ── Step 3: Attribution maps ──────────────────────────────────────────
        let grads = saliency_maps(
            &trained.outcome.model,
            sequences.view(),
            cfg.class_index,
            trained.batch_size,
            device,
        )?;
        let scores = grad_times_input(sequences.view(), grads.view());

        // ── Step 4: Against the ground truth ──────────────────────────────────
        let (roc, pr) = interpretability_performance(scores.view(), models.view(), cfg.info_threshold);
        let stats  = signal_noise_stats(scores.view(), models.view(), cfg.top_k, cfg.info_threshold);
        let ratios = snr(&stats.signal, &stats.noise_topk);

        // ── Step 5: Test-set evaluation ───────────────────────────────────────
        let eval = evaluate(
            &trained.outcome.model.valid(),
            SequenceDataset::new(dataset.clone(), SplitKind::Test),
            trained.batch_size,
            device,
        )?;

        // ── Step 6: Record ────────────────────────────────────────────────────
        let record = SaliencyTrialRecord {
            identifier:   trained.identifier,
            loss:         eval.loss,
            auroc:        eval.auroc,
            aupr:         eval.aupr,
            saliency_roc: mean_defined(roc),
            saliency_pr:  mean_defined(pr),
            snr:          mean_defined(ratios.into_iter().map(Some)),
            analysed:     rows.len(),
        };
        save_record(&record, &trained.paths.stats)?;

        tracing::info!(
            "[{}] saliency roc={:.4} pr={:.4} snr={:.3}",
            record.identifier, record.saliency_roc, record.saliency_pr, record.snr,
        );
        Ok(record)
    }
}

/// First `limit` rows whose label for `class_index` is set, in split order.
fn positive_rows(split: &Split, class_index: usize, limit: usize) -> Vec<usize> {
    split
        .labels()
        .column(class_index)
        .iter()
        .enumerate()
        .filter(|&(_, &y)| y == 1.0)
        .map(|(i, _)| i)
        .take(limit)
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use burn::backend::{Autodiff, NdArray};
    use ndarray::{array, Array3};

    use crate::application::config::TrainingConfig;
    use crate::data::fixtures::{toy_coded_dataset, toy_dataset};
    use crate::infra::layout::OutputLayout;
    use crate::ml::model::{Architecture, ArchitectureParams};
    use crate::ml::BACKEND_LOCK;

    type TB = Autodiff<NdArray>;

    fn small_run() -> RunConfig {
        RunConfig {
            architecture: Architecture::Cnn,
            params:       ArchitectureParams { num_filters: 4, dense_units: 8, ..Default::default() },
            training:     TrainingConfig { epochs: 1, batch_size: 10, ..TrainingConfig::default() },
            trials:       1,
            base_seed:    0,
        }
    }

    #[test]
    fn test_positive_rows_respects_limit_and_order() {
        let labels = array![[1.0f32, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];
        let split = Split::new(Array3::zeros((4, 5, 4)), labels).unwrap();
        assert_eq!(positive_rows(&split, 0, 10), vec![0, 2, 3]);
        assert_eq!(positive_rows(&split, 0, 2), vec![0, 2]);
        assert_eq!(positive_rows(&split, 1, 10), vec![1, 2]);
    }

    #[test]
    fn test_dataset_without_ground_truth_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(
            Arc::new(toy_dataset(10, 40, 2, 0)),
            OutputLayout::new(dir.path(), "synthetic", "cnn"),
        );
        let use_case = SaliencyUseCase::new(&ctx, small_run(), SaliencyConfig::default());
        let err = use_case.execute::<TB>(&Default::default()).unwrap_err();
        assert!(err.to_string().contains("model_test"));
        // nothing was trained
        assert!(!ctx.layout.trial(0).stats.exists());
    }

    #[test]
    fn test_trial_record_is_written() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(
            Arc::new(toy_coded_dataset(20, 40, 9)),
            OutputLayout::new(dir.path(), "coded", "cnn"),
        );
        let cfg = SaliencyConfig { num_analyze: 3, ..SaliencyConfig::default() };
        let use_case = SaliencyUseCase::new(&ctx, small_run(), cfg);

        let records = use_case.execute::<TB>(&Default::default()).unwrap();
        let r = &records[0];
        let positives = positive_rows(ctx.dataset.split(SplitKind::Test), 0, usize::MAX).len();
        assert_eq!(r.analysed, positives.min(3));
        assert!(r.snr.is_finite() || r.analysed == 0);
        assert!(ctx.layout.trial(0).stats.exists());
    }
}
