// ============================================================
// Attribution Quality Against Ground Truth
// ============================================================
// Every synthetic test sequence comes with the per-position
// probability model it was sampled from (`model_test`, L × 4).
// Positions whose model carries information are where a motif
// was implanted; the minimum-information positions are pure
// background.
//
//   interpretability_performance  per-sequence ROC-AUC / PR-AUC of
//                                 attribution scores at separating
//                                 motif positions from background
//   signal_noise_stats            mean score on motifs vs. the
//                                 background score distribution
//   snr                           signal / noise_topk, NaN → 0

use ndarray::{ArrayView1, ArrayView2, ArrayView3, Axis};

use crate::analysis::ranking::{pr_auc, roc_auc};
use crate::domain::pwm::row_information;

/// Information cut-off separating motif positions from background
pub const DEFAULT_INFO_THRESHOLD: f64 = 0.1;

/// Number of highest background scores averaged into the noise level
pub const DEFAULT_TOP_K: usize = 10;

/// Per-position information (bits) of one `L × 4` sequence model.
pub fn ground_truth_information(model: ArrayView2<'_, f32>) -> Vec<f64> {
    model
        .axis_iter(Axis(0))
        .map(|row| row_information(row.iter().map(|&p| p as f64)))
        .collect()
}

fn minimum(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

/// ROC-AUC and PR-AUC of every sequence's scores. `scores` is
/// `[N, L]`, `models` is `[N, L, 4]`. A sequence with only one
/// class among its evaluated positions gets None.
pub fn interpretability_performance(
    scores:    ArrayView2<'_, f64>,
    models:    ArrayView3<'_, f32>,
    threshold: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    assert_eq!(scores.dim(), (models.dim().0, models.dim().1));

    scores
        .axis_iter(Axis(0))
        .zip(models.axis_iter(Axis(0)))
        .map(|(score, model)| {
            let info   = ground_truth_information(model);
            let lowest = minimum(&info);

            // background positions that still carry some information are left out
            let (picked, labels): (Vec<f64>, Vec<bool>) = info
                .iter()
                .zip(score.iter())
                .filter(|&(&i, _)| i > threshold || i == lowest)
                .map(|(&i, &s)| (s, i > threshold))
                .unzip();

            (roc_auc(&picked, &labels), pr_auc(&picked, &labels))
        })
        .unzip()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalNoise {
    /// Mean score over motif positions
    pub signal:     Vec<f64>,
    /// Mean of the `top_k` largest background scores
    pub noise_topk: Vec<f64>,
}

pub fn signal_noise_stats(
    scores:    ArrayView2<'_, f64>,
    models:    ArrayView3<'_, f32>,
    top_k:     usize,
    threshold: f64,
) -> SignalNoise {
    assert_eq!(scores.dim(), (models.dim().0, models.dim().1));

    let mut stats = SignalNoise::default();
    for (score, model) in scores.axis_iter(Axis(0)).zip(models.axis_iter(Axis(0))) {
        let info   = ground_truth_information(model);
        let lowest = minimum(&info);

        stats.signal.push(mean(select(score, &info, |i| i > threshold)));

        let mut background: Vec<f64> = select(score, &info, |i| i == lowest).collect();
        background.sort_by(|a, b| b.total_cmp(a));

        stats.noise_topk.push(mean(background.iter().take(top_k).copied()));
    }
    stats
}

fn select<'s: 'a, 'a>(
    score: ArrayView1<'s, f64>,
    info:  &'a [f64],
    keep:  impl Fn(f64) -> bool + 'a,
) -> impl Iterator<Item = f64> + 'a {
    score
        .into_iter()
        .zip(info)
        .filter(move |&(_, &i)| keep(i))
        .map(|(&s, _)| s)
}

/// Element-wise signal / noise with undefined ratios set to 0.
pub fn snr(signal: &[f64], noise: &[f64]) -> Vec<f64> {
    signal
        .iter()
        .zip(noise)
        .map(|(s, n)| {
            let ratio = s / n;
            if ratio.is_nan() { 0.0 } else { ratio }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    const UNIFORM: [f32; 4] = [0.25; 4];
    const MOTIF:   [f32; 4] = [1.0, 0.0, 0.0, 0.0];

    /// One sequence of `len` positions with an implanted motif at `motif`.
    fn model(len: usize, motif: std::ops::Range<usize>) -> Array3<f32> {
        Array3::from_shape_fn((1, len, 4), |(_, p, c)| {
            if motif.contains(&p) { MOTIF[c] } else { UNIFORM[c] }
        })
    }

    #[test]
    fn test_information_of_uniform_and_fixed_rows() {
        let m = model(4, 1..2);
        let info = ground_truth_information(m.index_axis(Axis(0), 0));
        assert!(info[0].abs() < 1e-4);
        assert!((info[1] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_perfect_attribution() {
        let m = model(8, 2..4);
        let scores = Array2::from_shape_fn((1, 8), |(_, p)| if (2..4).contains(&p) { 1.0 } else { 0.0 });
        let (roc, pr) = interpretability_performance(scores.view(), m.view(), DEFAULT_INFO_THRESHOLD);
        assert_eq!(roc, vec![Some(1.0)]);
        assert_eq!(pr, vec![Some(1.0)]);
    }

    #[test]
    fn test_sequence_without_motif_is_undefined() {
        let m = model(6, 0..0);
        let scores = Array2::from_elem((1, 6), 0.3);
        let (roc, pr) = interpretability_performance(scores.view(), m.view(), DEFAULT_INFO_THRESHOLD);
        assert_eq!(roc, vec![None]);
        assert_eq!(pr, vec![None]);
    }

    #[test]
    fn test_signal_noise_and_snr() {
        let m = model(14, 0..2);
        // motif scores 4 and 6; background 1..=12 over twelve positions
        let scores = Array2::from_shape_fn((1, 14), |(_, p)| match p {
            0 => 4.0,
            1 => 6.0,
            p => (p - 1) as f64,
        });
        let stats = signal_noise_stats(scores.view(), m.view(), 10, DEFAULT_INFO_THRESHOLD);
        assert_eq!(stats.signal, vec![5.0]);
        // top ten of 1..=12 are 3..=12
        assert_eq!(stats.noise_topk, vec![7.5]);

        let ratio = snr(&stats.signal, &stats.noise_topk);
        assert!((ratio[0] - 5.0 / 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_snr_nan_becomes_zero() {
        assert_eq!(snr(&[f64::NAN, 0.0, 2.0], &[1.0, 0.0, 4.0]), vec![0.0, 0.0, 0.5]);
    }
}
