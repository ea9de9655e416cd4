// ============================================================
// Layer 2 — AnalyzeUseCase
// ============================================================
// Re-scores a motif file against a comparison directory that
// already exists, without training anything. Useful after
// changing the q-value cut-off or the ground-truth motif set.
//
//   Step 1: Count the filters in the motif file   (Layer 6 - infra)
//   Step 2: Read the comparison table             (Analysis)
//   Step 3: Summarise matches to the truth        (Analysis)
//   Step 4: Optionally save the summary as JSON

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::analysis::motif_match::{parse_tomtom, summarize_matches, MatchSummary};
use crate::domain::{comparison::RESULTS_FILE, motif_set::TrueMotifSet, pwm::FILTER_PREFIX};
use crate::infra::meme::read_meme;

pub struct AnalyzeUseCase {
    pub motif_file:  PathBuf,
    pub tomtom_dir:  PathBuf,
    pub q_threshold: f64,
    pub truth:       TrueMotifSet,
    pub output:      Option<PathBuf>,
}

impl AnalyzeUseCase {
    pub fn execute(&self) -> Result<MatchSummary> {
        // ── Step 1: Filters ───────────────────────────────────────────────────
        let motifs = read_meme(&self.motif_file)?;
        let num_filters = motifs.len();
        let empty = motifs.iter().filter(|(_, pwm)| pwm.is_empty()).count();

        // ── Step 2: Hits ──────────────────────────────────────────────────────
        // A missing table means no hits, the same as an empty one
        let hits = parse_tomtom(&self.tomtom_dir.join(RESULTS_FILE))?;
        tracing::info!("{} filters ({} empty), {} comparison hits", num_filters, empty, hits.len());

        // ── Step 3: Summary ───────────────────────────────────────────────────
        let summary = summarize_matches(&hits, num_filters, &self.truth, self.q_threshold, FILTER_PREFIX);

        // ── Step 4: Save ──────────────────────────────────────────────────────
        if let Some(path) = &self.output {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(&summary)?)
                .with_context(|| format!("Cannot write '{}'", path.display()))?;
            tracing::info!("Summary saved to '{}'", path.display());
        }
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::pwm::Pwm;
    use crate::infra::meme::write_meme;

    fn use_case(dir: &std::path::Path, q_threshold: f64) -> AnalyzeUseCase {
        AnalyzeUseCase {
            motif_file:  dir.join("trial-0.txt"),
            tomtom_dir:  dir.join("tomtom"),
            q_threshold,
            truth:       TrueMotifSet::synthetic(),
            output:      Some(dir.join("summary").join("trial-0.json")),
        }
    }

    fn write_inputs(dir: &std::path::Path) {
        let pwms = vec![Pwm::from_rows(&[[0.25, 0.25, 0.25, 0.25]]); 4];
        write_meme(&pwms, &dir.join("trial-0.txt"), FILTER_PREFIX).unwrap();
        fs::create_dir_all(dir.join("tomtom")).unwrap();
        fs::write(
            dir.join("tomtom").join(RESULTS_FILE),
            "Query_ID\tTarget_ID\tq-value\n\
             filter0\tMA0083.2\t0.01\n\
             filter3\tMA0095.1\t0.08\n",
        )
        .unwrap();
    }

    #[test]
    fn test_rescore_existing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        let summary = use_case(dir.path(), 0.1).execute().unwrap();
        assert_eq!(summary.num_filters, 4);
        assert_eq!(summary.match_fraction, 0.5);
        assert_eq!(summary.filter_matches[0].as_deref(), Some("srf"));
        assert_eq!(summary.filter_matches[3].as_deref(), Some("yy1"));
        assert!(dir.path().join("summary").join("trial-0.json").exists());
    }

    #[test]
    fn test_stricter_threshold_drops_weak_hit() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        let summary = use_case(dir.path(), 0.05).execute().unwrap();
        assert_eq!(summary.match_fraction, 0.25);
        assert_eq!(summary.filter_matches[3], None);
    }

    #[test]
    fn test_missing_table_means_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_meme(&[Pwm::empty(), Pwm::empty()], &dir.path().join("trial-0.txt"), FILTER_PREFIX).unwrap();

        let summary = use_case(dir.path(), 0.1).execute().unwrap();
        assert_eq!(summary.num_filters, 2);
        assert_eq!(summary.match_fraction, 0.0);
    }
}
