// ============================================================
// Layer 6 — Trial Statistics Store
// ============================================================
// Persists one trial record as two files side by side:
//
//   trial-<n>.npy   float64 vector of the record's numeric fields,
//                   in the record's fixed order
//   trial-<n>.json  the full record, identifier and status included
//
// The .npy file is what aggregation notebooks stack across
// trials; the .json sidecar keeps the fields an f64 array cannot.
//
// Reference: ndarray-npy documentation (write_npy)

use std::{fs, path::Path};

use anyhow::{Context, Result};
use ndarray::Array1;
use ndarray_npy::write_npy;

use crate::domain::record::TrialRecord;

pub fn save_record<R: TrialRecord>(record: &R, npy_path: &Path) -> Result<()> {
    if let Some(parent) = npy_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let values = Array1::from(record.numeric_values());
    write_npy(npy_path, &values)
        .with_context(|| format!("Cannot write statistics to '{}'", npy_path.display()))?;

    let sidecar = npy_path.with_extension("json");
    fs::write(&sidecar, serde_json::to_string_pretty(record)?)
        .with_context(|| format!("Cannot write '{}'", sidecar.display()))?;

    tracing::info!("Saved statistics for '{}' to '{}'", record.identifier(), npy_path.display());
    Ok(())
}
