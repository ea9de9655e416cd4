// Threshold-free ranking metrics over (score, label) pairs.
//
// Both curves are built from the distinct score values in
// descending order, so tied scores move the curve diagonally
// instead of in an order-dependent staircase.

/// Running true/false positive counts after each distinct score.
fn cumulative_counts(scores: &[f64], labels: &[bool]) -> Vec<(f64, f64)> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = Vec::new();
    let (mut tp, mut fp) = (0.0, 0.0);
    for (k, &i) in order.iter().enumerate() {
        if labels[i] { tp += 1.0 } else { fp += 1.0 }
        let last_of_group = order
            .get(k + 1)
            .map_or(true, |&next| scores[next].total_cmp(&scores[i]).is_ne());
        if last_of_group {
            points.push((tp, fp));
        }
    }
    points
}

/// Area under the ROC curve. None when only one class is present.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    assert_eq!(scores.len(), labels.len());
    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let negatives = labels.len() as f64 - positives;
    if positives == 0.0 || negatives == 0.0 {
        return None;
    }

    let mut area = 0.0;
    let (mut prev_tp, mut prev_fp) = (0.0, 0.0);
    for (tp, fp) in cumulative_counts(scores, labels) {
        area += (fp - prev_fp) * (tp + prev_tp) / 2.0;
        prev_tp = tp;
        prev_fp = fp;
    }
    Some(area / (positives * negatives))
}

/// Area under the precision-recall curve (trapezoidal, starting at
/// recall 0 / precision 1). None when there are no positives.
pub fn pr_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    assert_eq!(scores.len(), labels.len());
    let positives = labels.iter().filter(|&&l| l).count() as f64;
    if positives == 0.0 {
        return None;
    }

    let mut area = 0.0;
    let (mut prev_recall, mut prev_precision) = (0.0, 1.0);
    for (tp, fp) in cumulative_counts(scores, labels) {
        let recall    = tp / positives;
        let precision = tp / (tp + fp);
        area += (recall - prev_recall) * (precision + prev_precision) / 2.0;
        prev_recall    = recall;
        prev_precision = precision;
        if tp == positives {
            break;
        }
    }
    Some(area)
}

/// Mean over the defined values; NaN if none are defined.
pub fn mean_defined(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let scores = [0.9, 0.8, 0.2, 0.1];
        let labels = [true, true, false, false];
        assert_eq!(roc_auc(&scores, &labels), Some(1.0));
        assert_eq!(pr_auc(&scores, &labels), Some(1.0));
    }

    #[test]
    fn test_inverted_ranking() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        let labels = [true, true, false, false];
        assert_eq!(roc_auc(&scores, &labels), Some(0.0));
    }

    #[test]
    fn test_all_tied_scores_give_half_roc() {
        let scores = [0.5; 6];
        let labels = [true, false, true, false, false, true];
        let auc = roc_auc(&scores, &labels).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_ranking_roc() {
        // one of four positive/negative pairs is mis-ordered
        let scores = [0.9, 0.6, 0.7, 0.1];
        let labels = [true, true, false, false];
        let auc = roc_auc(&scores, &labels).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_pr_auc_hand_computed() {
        // ranks: P N P N → points (r,p): (0,1) (0.5,1) (0.5,0.5) (1,0.667)
        let scores = [0.9, 0.8, 0.7, 0.6];
        let labels = [true, false, true, false];
        let auc = pr_auc(&scores, &labels).unwrap();
        let expected = 0.5 * 1.0 + 0.5 * (0.5 + 2.0 / 3.0) / 2.0;
        assert!((auc - expected).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_undefined() {
        assert_eq!(roc_auc(&[0.1, 0.2], &[true, true]), None);
        assert_eq!(roc_auc(&[0.1, 0.2], &[false, false]), None);
        assert_eq!(pr_auc(&[0.1, 0.2], &[false, false]), None);
    }

    #[test]
    fn test_mean_defined_skips_missing() {
        assert_eq!(mean_defined([Some(1.0), None, Some(3.0)]), 2.0);
        assert!(mean_defined([None, None]).is_nan());
    }
}
