use std::sync::Arc;

use burn::data::dataset::Dataset;
use ndarray::Axis;

use crate::domain::genomic::{GenomicDataset, SplitKind};

/// One sequence with its multi-label target, flattened row-major.
/// `sequence` has `positions * 4` values, `target` one per class.
#[derive(Debug, Clone)]
pub struct SequenceSample {
    pub sequence:  Vec<f32>,
    pub target:    Vec<f32>,
    pub positions: usize,
}

impl SequenceSample {
    pub fn num_classes(&self) -> usize {
        self.target.len()
    }
}

/// A read-only view of one split of the shared dataset.
/// Cloning the Arc is all it costs to hand a split to a loader.
pub struct SequenceDataset {
    dataset: Arc<GenomicDataset>,
    kind:    SplitKind,
}

impl SequenceDataset {
    pub fn new(dataset: Arc<GenomicDataset>, kind: SplitKind) -> Self {
        Self { dataset, kind }
    }

    pub fn sample_count(&self) -> usize {
        self.dataset.split(self.kind).len()
    }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        let split = self.dataset.split(self.kind);
        if index >= split.len() {
            return None;
        }
        let sequence = split.sequences().index_axis(Axis(0), index).iter().copied().collect();
        let target   = split.labels().index_axis(Axis(0), index).iter().copied().collect();
        Some(SequenceSample { sequence, target, positions: split.seq_len() })
    }

    fn len(&self) -> usize {
        self.sample_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::genomic::Split;
    use ndarray::{Array2, Array3};

    fn tiny() -> Arc<GenomicDataset> {
        let split = |n: usize| {
            let x = Array3::from_shape_fn((n, 5, 4), |(i, p, c)| (i * 100 + p * 4 + c) as f32);
            let y = Array2::from_shape_fn((n, 2), |(i, c)| ((i + c) % 2) as f32);
            Split::new(x, y).unwrap()
        };
        Arc::new(GenomicDataset { train: split(3), valid: split(2), test: split(1), ground_truth: None })
    }

    #[test]
    fn test_get_flattens_row_major() {
        let ds = SequenceDataset::new(tiny(), SplitKind::Train);
        let s = ds.get(1).unwrap();
        assert_eq!(s.positions, 5);
        assert_eq!(s.sequence.len(), 20);
        assert_eq!(s.sequence[0], 100.0);
        assert_eq!(s.sequence[5], 105.0);
        assert_eq!(s.target, vec![1.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_is_none() {
        let ds = SequenceDataset::new(tiny(), SplitKind::Valid);
        assert_eq!(ds.len(), 2);
        assert!(ds.get(2).is_none());
    }
}
