//! Composite docking score and replicate collapse.
//!
//! Each docked pose gets a `FittedScore = RankScore - 0.16 * MatchScore`
//! (lower is a more favourable predicted binding). Collapsing the replicates of
//! a compound keeps its lowest-scoring pose; the resulting one-row-per-compound
//! set gives the docking-only baseline AUC that model scores are compared with.
use std::collections::HashSet;

use log::info;

use crate::metrics::roc_auc;
use crate::records::{Activity, CompoundRecord};

/// Weight of the match component in the composite score.
pub const MATCH_WEIGHT: f64 = 0.16;

/// Composite FITTED score of one pose.
pub fn fitted_score(rank_score: f64, match_score: f64) -> f64 {
    rank_score - MATCH_WEIGHT * match_score
}

/// Best-scoring replicate of one compound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Representative {
    /// Compound id.
    pub compound_id: u64,
    /// Activity label.
    pub activity: Activity,
    /// `RankScore - 0.16 * MatchScore` of the kept row.
    pub fitted_score: f64,
    /// RankScore of the kept row.
    pub rank_score: f64,
    /// Index of the kept row in the input slice.
    pub row: usize,
}

/// One representative per compound, plus the docking-only AUC.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Sorted by ascending `fitted_score`.
    pub representatives: Vec<Representative>,
    /// `None` when only one activity class survived cleaning.
    pub baseline_auc: Option<f64>,
}

impl Normalized {
    /// Ids of every representative.
    pub fn compound_ids(&self) -> HashSet<u64> {
        self.representatives.iter().map(|r| r.compound_id).collect()
    }
}

/// Collapse replicates to their lowest-`FittedScore` row.
///
/// The sort is stable, so ties keep the earlier input row.
pub fn normalize(records: &[CompoundRecord]) -> Normalized {
    let scores: Vec<f64> = records
        .iter()
        .map(|r| fitted_score(r.rank_score, r.match_score))
        .collect();

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut seen = HashSet::new();
    let representatives: Vec<Representative> = order
        .into_iter()
        .filter(|&i| seen.insert(records[i].compound_id))
        .map(|i| Representative {
            compound_id: records[i].compound_id,
            activity: records[i].activity,
            fitted_score: scores[i],
            rank_score: records[i].rank_score,
            row: i,
        })
        .collect();

    // Actives should score lower, so rank on the negated score
    let labels: Vec<bool> = representatives.iter().map(|r| r.activity.is_active()).collect();
    let negated: Vec<f64> = representatives.iter().map(|r| -r.fitted_score).collect();
    let baseline_auc = roc_auc(&labels, &negated);

    Normalized {
        representatives,
        baseline_auc,
    }
}

/// Mean RankScore of actives and inactives, logged per isoform.
pub fn rank_score_means(records: &[CompoundRecord]) -> (f64, f64) {
    let mean = |activity: Activity| {
        let (sum, n) = records
            .iter()
            .filter(|r| r.activity == activity)
            .fold((0.0, 0usize), |(s, n), r| (s + r.rank_score, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    };
    let (active, inactive) = (mean(Activity::Active), mean(Activity::Inactive));
    info!(
        "RankScore mean: actives {active:.3}, inactives {inactive:.3}, difference {:.3}",
        active - inactive
    );
    (active, inactive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rec(id: u64, activity: Activity, rank: f64, matched: f64) -> CompoundRecord {
        CompoundRecord {
            compound_id: id,
            name: format!("{id}"),
            activity,
            rank_score: rank,
            match_score: matched,
            features: vec![rank, matched],
        }
    }

    #[test]
    fn composite_score_weights_match_component() {
        assert_relative_eq!(fitted_score(-10.0, 5.0), -10.8, epsilon = 1e-12);
    }

    #[test]
    fn one_row_per_compound_with_minimum_score() {
        let records = vec![
            rec(1, Activity::Active, -5.0, 0.0),
            rec(1, Activity::Active, -9.0, 0.0),
            rec(2, Activity::Inactive, -4.0, 0.0),
            rec(1, Activity::Active, -7.0, 0.0),
            rec(2, Activity::Inactive, -6.0, 0.0),
        ];
        let norm = normalize(&records);
        assert_eq!(norm.representatives.len(), 2);
        assert_eq!(norm.representatives[0].compound_id, 1);
        assert_eq!(norm.representatives[0].row, 1);
        assert_eq!(norm.representatives[1].row, 4);
        // Actives score lower than inactives here, so the baseline is perfect
        assert_relative_eq!(norm.baseline_auc.unwrap(), 1.0);
    }

    #[test]
    fn ties_keep_the_earlier_row() {
        let records = vec![
            rec(3, Activity::Active, -8.0, 0.0),
            rec(3, Activity::Active, -8.0, 0.0),
            rec(3, Activity::Active, -8.0, 0.0),
        ];
        let norm = normalize(&records);
        assert_eq!(norm.representatives.len(), 1);
        assert_eq!(norm.representatives[0].row, 0);
        assert!(norm.baseline_auc.is_none());
    }

    #[test]
    fn score_means_split_by_activity() {
        let records = vec![
            rec(1, Activity::Active, -8.0, 0.0),
            rec(1, Activity::Active, -6.0, 0.0),
            rec(2, Activity::Inactive, -3.0, 0.0),
        ];
        let (a, i) = rank_score_means(&records);
        assert_relative_eq!(a, -7.0);
        assert_relative_eq!(i, -3.0);
    }
}
