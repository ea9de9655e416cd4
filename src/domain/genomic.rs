// ============================================================
// Layer 3 — Genomic Dataset Domain Types
// ============================================================
// A dataset bundle is three pre-made splits of one-hot DNA
// sequences with multi-label targets, plus (for the coded
// synthetic dataset) a ground-truth "where is the motif" array
// aligned with the test sequences.
//
// Shapes (channels-last, after loading):
//   sequences:    [samples, positions, 4]
//   labels:       [samples, classes]
//   ground_truth: [samples, positions, 4]
//
// The structs are immutable after loading; the application
// wraps the whole dataset in an Arc and hands out read-only
// views to every trial.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// One split (train, valid or test) of sequences with labels.
#[derive(Debug, Clone)]
pub struct Split {
    sequences: Array3<f32>,
    labels:    Array2<f32>,
}

impl Split {
    /// Pair sequences and labels. Returns None when row counts differ.
    pub fn new(sequences: Array3<f32>, labels: Array2<f32>) -> Option<Self> {
        if sequences.len_of(Axis(0)) != labels.len_of(Axis(0)) {
            return None;
        }
        Some(Self { sequences, labels })
    }

    pub fn len(&self) -> usize {
        self.sequences.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of positions per sequence (200 for the synthetic datasets)
    pub fn seq_len(&self) -> usize {
        self.sequences.len_of(Axis(1))
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len_of(Axis(1))
    }

    pub fn sequences(&self) -> ArrayView3<'_, f32> {
        self.sequences.view()
    }

    pub fn labels(&self) -> ArrayView2<'_, f32> {
        self.labels.view()
    }
}

/// The full bundle returned by a DatasetSource.
#[derive(Debug, Clone)]
pub struct GenomicDataset {
    pub train: Split,
    pub valid: Split,
    pub test:  Split,

    /// Per-position ground-truth motif probabilities for the
    /// test split. Only present in the coded synthetic dataset.
    pub ground_truth: Option<Array3<f32>>,
}

/// Which of the three splits to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    Train,
    Valid,
    Test,
}

impl GenomicDataset {
    pub fn split(&self, kind: SplitKind) -> &Split {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Valid => &self.valid,
            SplitKind::Test  => &self.test,
        }
    }

    pub fn seq_len(&self) -> usize {
        self.train.seq_len()
    }

    pub fn num_classes(&self) -> usize {
        self.train.num_classes()
    }
}
