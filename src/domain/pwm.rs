// ============================================================
// Layer 3 — Position Weight Matrix
// ============================================================
// One matrix per convolutional filter: rows are positions,
// columns are the nucleotides A, C, G, T.
//
// A PWM may have zero rows. That happens when no sub-sequence
// activated the filter strongly enough, and the empty matrix
// must stay in the list because the list index is the filter
// index used by the motif file and the Tomtom results.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Nucleotide column order of every PWM
pub const ALPHABET: [char; 4] = ['A', 'C', 'G', 'T'];

/// Motif names are `{FILTER_PREFIX}{filter index}`, e.g. `filter7`
pub const FILTER_PREFIX: &str = "filter";

const LOG_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub struct Pwm {
    matrix: Array2<f64>,
}

impl Pwm {
    /// Wrap a `positions × 4` matrix. Returns None for any other width.
    pub fn from_matrix(matrix: Array2<f64>) -> Option<Self> {
        (matrix.ncols() == ALPHABET.len()).then_some(Self { matrix })
    }

    pub fn from_rows(rows: &[[f64; 4]]) -> Self {
        let mut matrix = Array2::zeros((rows.len(), 4));
        for (mut dst, src) in matrix.axis_iter_mut(Axis(0)).zip(rows) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = *s;
            }
        }
        Self { matrix }
    }

    /// A filter with no passing activations
    pub fn empty() -> Self {
        Self { matrix: Array2::zeros((0, ALPHABET.len())) }
    }

    /// Number of positions (rows)
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.matrix.axis_iter(Axis(0))
    }

    /// Information content (bits) of every row.
    pub fn information(&self) -> Vec<f64> {
        self.rows().map(|r| row_information(r.iter().copied())).collect()
    }

    /// Copy of rows `start..end`.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        Self { matrix: self.matrix.slice(ndarray::s![start..end, ..]).to_owned() }
    }
}

/// `log2(4) + Σ p·log2(p + ε)`: 2 bits for a fully determined
/// position, 0 bits for a uniform one.
pub fn row_information(probs: impl IntoIterator<Item = f64>) -> f64 {
    2.0 + probs
        .into_iter()
        .map(|p| p * (p + LOG_EPSILON).log2())
        .sum::<f64>()
}
