// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two external collaborators of the pipeline sit behind
// traits, so the application layer never cares whether data
// comes over HTTP or from disk, or whether motifs are compared
// by the real Tomtom script or a test double.
//
//   DatasetSource   — implemented by data::loader::BundleSource
//   MotifComparator — implemented by infra::tomtom::ExternalComparator
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::comparison::{ComparisonError, ComparisonOutcome};
use crate::domain::genomic::GenomicDataset;

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Any component that can produce the train/valid/test bundle.
pub trait DatasetSource {
    /// Load the whole bundle. Called once per process.
    fn load(&self) -> Result<GenomicDataset>;
}

// ─── MotifComparator ──────────────────────────────────────────────────────────
/// Any component that compares a MEME motif file against a
/// motif database and leaves a results table in `output_dir`.
pub trait MotifComparator {
    fn compare(
        &self,
        motif_file: &Path,
        output_dir: &Path,
    ) -> Result<ComparisonOutcome, ComparisonError>;
}
