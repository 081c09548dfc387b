//! Re-expansion of compound ids to replicate rows.

use std::collections::{HashMap, HashSet};

use super::ReplicateQuota;
use crate::records::CompoundRecord;

/// Rows of `records` whose compound id is in `ids`, keeping at most
/// `quota.limit(id)` rows per compound. The first rows in input order win.
pub fn expand<'a>(
    records: &'a [CompoundRecord],
    ids: &[u64],
    quota: &ReplicateQuota,
) -> Vec<&'a CompoundRecord> {
    let wanted: HashSet<u64> = ids.iter().copied().collect();
    let mut taken: HashMap<u64, usize> = HashMap::new();

    records
        .iter()
        .filter(|r| {
            if !wanted.contains(&r.compound_id) {
                return false;
            }
            let n = taken.entry(r.compound_id).or_insert(0);
            if *n >= quota.limit(r.compound_id) {
                return false;
            }
            *n += 1;
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Activity;

    fn rows() -> Vec<CompoundRecord> {
        let mut out = Vec::new();
        for id in [10u64, 20] {
            for rep in 1..=5 {
                out.push(CompoundRecord {
                    compound_id: id,
                    name: format!("{id}_{rep}"),
                    activity: Activity::Active,
                    rank_score: rep as f64,
                    match_score: 0.0,
                    features: vec![rep as f64],
                });
            }
        }
        out
    }

    #[test]
    fn all_replicates_without_quota() {
        let records = rows();
        let kept = expand(&records, &[20], &ReplicateQuota::All);
        assert_eq!(kept.len(), 5);
        assert!(kept.iter().all(|r| r.compound_id == 20));
    }

    #[test]
    fn quota_keeps_the_first_rows() {
        let records = rows();
        let quota = ReplicateQuota::PerCompound(HashMap::from([(10, 2), (20, 1)]));
        let kept = expand(&records, &[10, 20], &quota);
        let names: Vec<&str> = kept.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["10_1", "10_2", "20_1"]);
    }
}
