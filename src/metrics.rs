//! Ranking and classification metrics.
//!
//! [`roc_auc`] is the rank-based (Mann–Whitney) area under the ROC curve with
//! average ranks for ties, which matches the usual trapezoidal ROC AUC.
//! [`evaluate`] turns positive-class probabilities into the metric block that
//! ends up in the results table.

/// ROC AUC of `scores` against binary `labels` (`true` = positive class).
///
/// Returns `None` when only one class is present.
///
/// ```
/// use cyp_dock_ml::metrics::roc_auc;
///
/// let auc = roc_auc(&[false, false, true, true], &[0.1, 0.4, 0.35, 0.8]).unwrap();
/// assert!((auc - 0.75).abs() < 1e-12);
/// ```
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    debug_assert_eq!(labels.len(), scores.len(), "labels and scores must align");
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average 1-based ranks over tied groups
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }

    let rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let u = rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

/// Test-set performance of one fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationReport {
    /// ROC AUC; `None` when the test set holds a single class.
    pub auc: Option<f64>,
    /// Fraction of correct calls at the 0.5 cut-off.
    pub accuracy: f64,
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN), the sensitivity.
    pub recall: f64,
    /// TN / (TN + FP).
    pub specificity: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Matthews correlation coefficient.
    pub mcc: f64,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Score positive-class probabilities against class labels (0/1), using a 0.5
/// decision threshold for the confusion-matrix metrics.
pub fn evaluate(labels: &[usize], probabilities: &[f64]) -> ClassificationReport {
    let truth: Vec<bool> = labels.iter().map(|&l| l == 1).collect();
    let (mut tp, mut tn, mut fp, mut fneg) = (0.0, 0.0, 0.0, 0.0);
    for (&t, &p) in truth.iter().zip(probabilities) {
        match (t, p >= 0.5) {
            (true, true) => tp += 1.0,
            (false, false) => tn += 1.0,
            (false, true) => fp += 1.0,
            (true, false) => fneg += 1.0,
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fneg);
    let mcc_den = ((tp + fp) * (tp + fneg) * (tn + fp) * (tn + fneg)).sqrt();
    ClassificationReport {
        auc: roc_auc(&truth, probabilities),
        accuracy: ratio(tp + tn, tp + tn + fp + fneg),
        precision,
        recall,
        specificity: ratio(tn, tn + fp),
        f1: ratio(2.0 * precision * recall, precision + recall),
        mcc: ratio(tp * tn - fp * fneg, mcc_den),
    }
}

impl ClassificationReport {
    /// Key/value pairs in result-table order.
    pub fn entries(&self) -> Vec<(String, String)> {
        let auc = self.auc.map_or_else(|| "nan".to_string(), |a| a.to_string());
        vec![
            ("auc".to_string(), auc),
            ("accuracy".to_string(), self.accuracy.to_string()),
            ("precision".to_string(), self.precision.to_string()),
            ("recall".to_string(), self.recall.to_string()),
            ("specificity".to_string(), self.specificity.to_string()),
            ("f1".to_string(), self.f1.to_string()),
            ("mcc".to_string(), self.mcc.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_and_inverted_rankings() {
        let labels = [false, false, true, true];
        assert_relative_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_relative_eq!(roc_auc(&labels, &[0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0);
    }

    #[test]
    fn ties_count_half() {
        let labels = [false, true];
        assert_relative_eq!(roc_auc(&labels, &[0.5, 0.5]).unwrap(), 0.5);
    }

    #[test]
    fn single_class_has_no_auc() {
        assert!(roc_auc(&[true, true], &[0.1, 0.2]).is_none());
    }

    #[test]
    fn confusion_metrics() {
        // tp=2 fn=1 tn=2 fp=1
        let labels = [1, 1, 1, 0, 0, 0];
        let probs = [0.9, 0.7, 0.2, 0.1, 0.3, 0.6];
        let r = evaluate(&labels, &probs);
        assert_relative_eq!(r.accuracy, 4.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(r.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.recall, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.specificity, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.f1, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.mcc, 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(r.entries()[0].0, "auc");
    }
}
