// ============================================================
// Layer 3 — Trial Result Records
// ============================================================
// One record per trial, written once and never updated.
// The numeric fields are persisted as a flat array in a fixed
// order, so downstream notebooks can stack trials without
// knowing field names:
//
//   motif pipeline:    [loss, auroc, aupr, match_frac, false_frac]
//   saliency pipeline: [loss, auroc, aupr, saliency_roc, saliency_pr, snr]
//
// The identifier (and the comparison status) travel in a JSON
// sidecar next to the array.

use serde::{Deserialize, Serialize};

use crate::domain::comparison::ComparisonStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifTrialRecord {
    pub identifier:        String,
    pub loss:              f64,
    pub auroc:             f64,
    pub aupr:              f64,
    pub match_fraction:    f64,
    pub false_fraction:    f64,
    pub comparison_status: ComparisonStatus,
}

impl MotifTrialRecord {
    pub fn values(&self) -> Vec<f64> {
        vec![self.loss, self.auroc, self.aupr, self.match_fraction, self.false_fraction]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaliencyTrialRecord {
    pub identifier:   String,
    pub loss:         f64,
    pub auroc:        f64,
    pub aupr:         f64,
    pub saliency_roc: f64,
    pub saliency_pr:  f64,
    pub snr:          f64,
    /// How many positive-label test sequences were explained
    pub analysed:     usize,
}

impl SaliencyTrialRecord {
    pub fn values(&self) -> Vec<f64> {
        vec![
            self.loss,
            self.auroc,
            self.aupr,
            self.saliency_roc,
            self.saliency_pr,
            self.snr,
        ]
    }
}

/// Anything that can be persisted by the stats store.
pub trait TrialRecord: Serialize {
    fn identifier(&self) -> &str;
    fn numeric_values(&self) -> Vec<f64>;
}

impl TrialRecord for MotifTrialRecord {
    fn identifier(&self) -> &str { &self.identifier }
    fn numeric_values(&self) -> Vec<f64> { self.values() }
}

impl TrialRecord for SaliencyTrialRecord {
    fn identifier(&self) -> &str { &self.identifier }
    fn numeric_values(&self) -> Vec<f64> { self.values() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motif_record_value_order() {
        let r = MotifTrialRecord {
            identifier:        "cnn-att--trial-1".into(),
            loss:              0.1,
            auroc:             0.9,
            aupr:              0.8,
            match_fraction:    0.6,
            false_fraction:    0.2,
            comparison_status: ComparisonStatus::Matched,
        };
        assert_eq!(r.values(), vec![0.1, 0.9, 0.8, 0.6, 0.2]);
    }

    #[test]
    fn test_saliency_record_value_order() {
        let r = SaliencyTrialRecord {
            identifier:   "cnn--trial-2".into(),
            loss:         0.2,
            auroc:        0.95,
            aupr:         0.85,
            saliency_roc: 0.7,
            saliency_pr:  0.5,
            snr:          3.0,
            analysed:     500,
        };
        assert_eq!(r.values(), vec![0.2, 0.95, 0.85, 0.7, 0.5, 3.0]);
    }
}
