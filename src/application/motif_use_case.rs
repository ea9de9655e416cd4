// ============================================================
// Layer 2 — MotifUseCase
// ============================================================
// Runs the motif pipeline for every trial of one group:
//
//   Step 1: Train the trial                  (Layer 2 - context)
//   Step 2: Extract one PWM per filter       (Layer 5 - ml)
//   Step 3: Write the MEME motif file        (Layer 6 - infra)
//   Step 4: Compare against the database     (Layer 6 - infra)
//   Step 5: Score matches to the truth       (Analysis)
//   Step 6: Evaluate on the test split       (Layer 5 - ml)
//   Step 7: Persist the trial record         (Layer 6 - infra)
//
// A failed comparison does not stop the run, and neither does
// a table that cannot be parsed: the trial is scored as zero
// matches and the failure is kept in the record's comparison
// status.

use std::fs;

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};

use crate::analysis::motif_match::{parse_tomtom, summarize_matches, MatchSummary};
use crate::application::config::{ExtractionConfig, RunConfig};
use crate::application::context::PipelineContext;
use crate::data::dataset::SequenceDataset;
use crate::domain::{
    comparison::{ComparisonOutcome, ComparisonStatus},
    genomic::SplitKind,
    motif_set::TrueMotifSet,
    pwm::FILTER_PREFIX,
    record::MotifTrialRecord,
    traits::MotifComparator,
};
use crate::infra::{
    meme::{count_meme_entries, write_meme},
    stats_store::save_record,
};
use crate::ml::{evaluator::evaluate, extractor::extract_pwms};

/// Written next to the comparison output of every trial
pub const SUMMARY_FILE: &str = "summary.json";

pub struct MotifUseCase<'a, C: MotifComparator> {
    context:    &'a PipelineContext,
    comparator: C,
    truth:      TrueMotifSet,
    run:        RunConfig,
    extraction: ExtractionConfig,
}

impl<'a, C: MotifComparator> MotifUseCase<'a, C> {
    pub fn new(
        context:    &'a PipelineContext,
        comparator: C,
        truth:      TrueMotifSet,
        run:        RunConfig,
        extraction: ExtractionConfig,
    ) -> Self {
        Self { context, comparator, truth, run, extraction }
    }

    /// All trials, in order. Stops at the first trial that fails
    /// for a reason other than the comparison tool.
    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<Vec<MotifTrialRecord>> {
        let mut records = Vec::with_capacity(self.run.trials);
        for trial in 0..self.run.trials {
            let record = self
                .run_trial::<B>(trial, device)
                .with_context(|| format!("Trial {trial} failed"))?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn run_trial<B: AutodiffBackend>(&self, trial: usize, device: &B::Device) -> Result<MotifTrialRecord> {
        let dataset = &self.context.dataset;

        // ── Step 1: Train ─────────────────────────────────────────────────────
        let trained = self.context.train_trial::<B>(&self.run, trial, device)?;
        let paths   = &trained.paths;
        let model   = trained.outcome.model.valid();

        // ── Step 2: Filters → PWMs ────────────────────────────────────────────
        let test = dataset.split(SplitKind::Test);
        let pwms = extract_pwms(&model, test.sequences(), &self.extraction, trained.batch_size, device)?;

        // ── Step 3: MEME file ─────────────────────────────────────────────────
        write_meme(&pwms, &paths.motifs, FILTER_PREFIX)?;
        let num_filters = count_meme_entries(&paths.motifs)?;

        // ── Step 4: External comparison ───────────────────────────────────────
        let result = self.comparator.compare(&paths.motifs, &paths.tomtom_dir);
        let mut status = ComparisonStatus::of(&result);

        // ── Step 5: Match statistics ──────────────────────────────────────────
        let summary = match result {
            Ok(ComparisonOutcome::Results(table)) => match parse_tomtom(&table) {
                Ok(hits) => {
                    summarize_matches(&hits, num_filters, &self.truth, self.extraction.q_threshold, FILTER_PREFIX)
                }
                Err(e) => {
                    tracing::warn!("[{}] unreadable comparison table, scoring as no matches: {e:#}", trained.identifier);
                    status = ComparisonStatus::Malformed;
                    MatchSummary::empty(num_filters, &self.truth)
                }
            },
            Ok(ComparisonOutcome::Empty) => MatchSummary::empty(num_filters, &self.truth),
            Err(e) => {
                tracing::warn!("[{}] comparison failed, scoring as no matches: {e}", trained.identifier);
                MatchSummary::empty(num_filters, &self.truth)
            }
        };
        fs::create_dir_all(&paths.tomtom_dir)
            .with_context(|| format!("Cannot create '{}'", paths.tomtom_dir.display()))?;
        let summary_path = paths.tomtom_dir.join(SUMMARY_FILE);
        fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("Cannot write '{}'", summary_path.display()))?;

        // ── Step 6: Test-set evaluation ───────────────────────────────────────
        let eval = evaluate(
            &model,
            SequenceDataset::new(dataset.clone(), SplitKind::Test),
            trained.batch_size,
            device,
        )?;

        // ── Step 7: Record ────────────────────────────────────────────────────
        let record = MotifTrialRecord {
            identifier:        trained.identifier,
            loss:              eval.loss,
            auroc:             eval.auroc,
            aupr:              eval.aupr,
            match_fraction:    summary.match_fraction,
            false_fraction:    summary.false_fraction,
            comparison_status: status,
        };
        save_record(&record, &paths.stats)?;

        tracing::info!(
            "[{}] test auroc={:.4} aupr={:.4} match={:.3} false={:.3} ({:?})",
            record.identifier, record.auroc, record.aupr,
            record.match_fraction, record.false_fraction, record.comparison_status,
        );
        Ok(record)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::{path::Path, sync::Arc, time::Duration};
    use burn::backend::{Autodiff, NdArray};

    use crate::application::config::TrainingConfig;
    use crate::data::fixtures::toy_dataset;
    use crate::domain::comparison::{ComparisonError, RESULTS_FILE};
    use crate::infra::layout::OutputLayout;
    use crate::ml::model::{Architecture, ArchitectureParams};
    use crate::ml::BACKEND_LOCK;

    type TB = Autodiff<NdArray>;

    /// Pretends filters 0 and 1 matched ARID3 and filter 2 matched
    /// a database entry outside the ground truth.
    struct FakeTomtom;

    impl MotifComparator for FakeTomtom {
        fn compare(&self, motif_file: &Path, output_dir: &Path) -> Result<ComparisonOutcome, ComparisonError> {
            assert!(motif_file.exists());
            fs::create_dir_all(output_dir).unwrap();
            let table = output_dir.join(RESULTS_FILE);
            fs::write(
                &table,
                "Query_ID\tTarget_ID\tOptimal_offset\tp-value\tE-value\tq-value\n\
                 filter0\tMA0151.1\t0\t1e-5\t1e-3\t0.001\n\
                 filter1\tMA0601.1\t0\t1e-5\t1e-3\t0.02\n\
                 filter2\tMA9999.1\t0\t1e-5\t1e-3\t0.03\n",
            )
            .unwrap();
            Ok(ComparisonOutcome::Results(table))
        }
    }

    /// Writes a table whose q-value column holds text.
    struct GarbledTomtom;

    impl MotifComparator for GarbledTomtom {
        fn compare(&self, _: &Path, output_dir: &Path) -> Result<ComparisonOutcome, ComparisonError> {
            fs::create_dir_all(output_dir).unwrap();
            let table = output_dir.join(RESULTS_FILE);
            fs::write(&table, "Query_ID\tTarget_ID\tq-value\nfilter0\tMA0151.1\tnan?\n").unwrap();
            Ok(ComparisonOutcome::Results(table))
        }
    }

    struct SlowTomtom;

    impl MotifComparator for SlowTomtom {
        fn compare(&self, _: &Path, _: &Path) -> Result<ComparisonOutcome, ComparisonError> {
            Err(ComparisonError::TimedOut(Duration::from_secs(1)))
        }
    }

    fn small_run(trials: usize) -> RunConfig {
        RunConfig {
            architecture: Architecture::Cnn,
            params:       ArchitectureParams { num_filters: 4, dense_units: 8, ..Default::default() },
            training:     TrainingConfig { epochs: 1, batch_size: 10, ..TrainingConfig::default() },
            trials,
            base_seed:    7,
        }
    }

    fn context(dir: &Path) -> PipelineContext {
        PipelineContext::new(
            Arc::new(toy_dataset(20, 40, 2, 3)),
            OutputLayout::new(dir, "synthetic", "cnn"),
        )
    }

    #[test]
    fn test_trial_scores_fake_matches() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let use_case = MotifUseCase::new(
            &ctx, FakeTomtom, TrueMotifSet::synthetic(), small_run(1), ExtractionConfig::default(),
        );

        let records = use_case.execute::<TB>(&Default::default()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.identifier, "cnn--trial-0");
        assert_eq!(r.comparison_status, ComparisonStatus::Matched);
        // 2 of 4 filters hit the truth, 3 of 4 hit anything
        assert!((r.match_fraction - 0.5).abs() < 1e-12);
        assert!((r.false_fraction - 0.25).abs() < 1e-12);

        let paths = ctx.layout.trial(0);
        assert_eq!(count_meme_entries(&paths.motifs).unwrap(), 4);
        assert!(paths.stats.exists());
        assert!(paths.history.exists());
        assert!(paths.tomtom_dir.join(SUMMARY_FILE).exists());
    }

    #[test]
    fn test_comparison_failure_scores_zero_and_keeps_status() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let use_case = MotifUseCase::new(
            &ctx, SlowTomtom, TrueMotifSet::synthetic(), small_run(2), ExtractionConfig::default(),
        );

        let records = use_case.execute::<TB>(&Default::default()).unwrap();
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.comparison_status, ComparisonStatus::TimedOut);
            assert_eq!(r.match_fraction, 0.0);
            assert_eq!(r.false_fraction, 0.0);
        }
        assert_eq!(records[1].identifier, "cnn--trial-1");
        assert!(ctx.layout.trial(1).stats.exists());
    }

    #[test]
    fn test_unreadable_table_scores_zero_and_run_continues() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let use_case = MotifUseCase::new(
            &ctx, GarbledTomtom, TrueMotifSet::synthetic(), small_run(2), ExtractionConfig::default(),
        );

        let records = use_case.execute::<TB>(&Default::default()).unwrap();
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.comparison_status, ComparisonStatus::Malformed);
            assert_eq!(r.match_fraction, 0.0);
            assert_eq!(r.false_fraction, 0.0);
        }
        assert!(ctx.layout.trial(1).stats.exists());
    }
}
