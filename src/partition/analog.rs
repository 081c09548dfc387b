//! Analog-cluster partitioning.
//!
//! Input is two externally computed cluster lists per isoform and threshold
//! (actives, inactives). A compound id may be listed several times; the count
//! is the number of its analogs that survived clustering, and only that many of
//! its docking replicates are trusted. With the list
//!
//! ```text
//! 858515
//! 858515
//! 4239273
//! ```
//!
//! two replicate rows of 858515 and one of 4239273 are kept (the first ones in
//! row order); the remaining replicates and every unlisted compound are dropped.
//!
//! The split itself is positional and not randomised: the first
//! `floor(n * (1 - test_size))` listed actives (in row order) are train, the rest
//! test, and the same for inactives.
use std::collections::{HashMap, HashSet};

use log::info;

use super::{Partition, PartitionStrategy, ReplicateQuota};
use crate::error::Result;
use crate::records::{Activity, CompoundRecord};
use crate::scoring::Normalized;

/// Analog-cluster strategy for one isoform × threshold.
#[derive(Debug, Clone)]
pub struct AnalogClusterSplit {
    /// Active list followed by inactive list.
    cluster_list: Vec<u64>,
    test_size: f64,
    max_replicates: usize,
}

impl AnalogClusterSplit {
    /// Split over the concatenated cluster lists; an id is listed once per kept replicate.
    pub fn new(actives: Vec<u64>, inactives: Vec<u64>, test_size: f64, max_replicates: usize) -> Self {
        let mut cluster_list = actives;
        cluster_list.extend(inactives);
        Self {
            cluster_list,
            test_size,
            max_replicates,
        }
    }

    /// How often each id is listed.
    pub fn appearances(&self) -> HashMap<u64, usize> {
        let mut counts = HashMap::new();
        for &id in &self.cluster_list {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts
    }

    /// Replicate rows kept per listed compound: `min(appearances, max_replicates)`.
    pub fn quota(&self) -> ReplicateQuota {
        ReplicateQuota::PerCompound(
            self.appearances()
                .into_iter()
                .map(|(id, n)| (id, n.min(self.max_replicates)))
                .collect(),
        )
    }

    fn train_count(&self, n: usize) -> usize {
        (n as f64 * (1.0 - self.test_size)).floor() as usize
    }
}

impl PartitionStrategy for AnalogClusterSplit {
    fn label(&self) -> &'static str {
        "analog"
    }

    fn partition(&self, records: &[CompoundRecord], _normalized: &Normalized) -> Result<Partition> {
        let listed: HashSet<u64> = self.cluster_list.iter().copied().collect();

        // Listed compounds in first-appearance order, per activity
        let mut seen = HashSet::new();
        let mut actives = Vec::new();
        let mut inactives = Vec::new();
        for rec in records {
            if listed.contains(&rec.compound_id) && seen.insert(rec.compound_id) {
                match rec.activity {
                    Activity::Active => actives.push(rec.compound_id),
                    Activity::Inactive => inactives.push(rec.compound_id),
                }
            }
        }

        let n_a = self.train_count(actives.len());
        let n_i = self.train_count(inactives.len());
        info!(
            "analog clusters: {} actives ({} train), {} inactives ({} train)",
            actives.len(),
            n_a,
            inactives.len(),
            n_i
        );

        let mut train = actives[..n_a].to_vec();
        train.extend_from_slice(&inactives[..n_i]);
        let mut test = actives[n_a..].to_vec();
        test.extend_from_slice(&inactives[n_i..]);

        Ok(Partition {
            train,
            test,
            quota: self.quota(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::normalize;

    fn records(actives: &[u64], inactives: &[u64], reps: usize) -> Vec<CompoundRecord> {
        let mut out = Vec::new();
        for (ids, activity) in [(actives, Activity::Active), (inactives, Activity::Inactive)] {
            for &id in ids {
                for rep in 1..=reps {
                    out.push(CompoundRecord {
                        compound_id: id,
                        name: format!("{id}_{rep}"),
                        activity,
                        rank_score: -(rep as f64),
                        match_score: 0.0,
                        features: vec![rep as f64],
                    });
                }
            }
        }
        out
    }

    #[test]
    fn listed_count_sets_the_replicate_quota() {
        let recs = records(&[858515, 4239273, 4240892], &[7976341], 5);
        let split = AnalogClusterSplit::new(
            vec![858515, 858515, 4239273, 4240892, 4240892, 4240892, 4240892, 4240892, 4240892],
            vec![7976341],
            0.2,
            5,
        );
        let quota = split.quota();
        assert_eq!(quota.limit(858515), 2);
        assert_eq!(quota.limit(4239273), 1);
        // listed six times, capped at five replicates
        assert_eq!(quota.limit(4240892), 5);

        let partition = split.partition(&recs, &normalize(&recs)).unwrap();
        let (train, test) = partition.expand(&recs);
        let all: Vec<&str> = train.iter().chain(&test).map(|r| r.name.as_str()).collect();
        assert_eq!(all.iter().filter(|n| n.starts_with("858515_")).count(), 2);
        assert!(all.contains(&"858515_1") && all.contains(&"858515_2"));
        assert_eq!(
            all.iter().filter(|n| n.starts_with("4239273_")).collect::<Vec<_>>(),
            vec![&"4239273_1"]
        );
    }

    #[test]
    fn unlisted_compounds_are_dropped() {
        let recs = records(&[1, 2, 3], &[4, 5], 5);
        let split = AnalogClusterSplit::new(vec![1, 3], vec![5], 0.2, 5);
        let p = split.partition(&recs, &normalize(&recs)).unwrap();
        let mut all: Vec<u64> = p.train.iter().chain(&p.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![1, 3, 5]);
    }

    #[test]
    fn positional_split_within_each_class() {
        let actives: Vec<u64> = (1..=10).collect();
        let inactives: Vec<u64> = (101..=105).collect();
        let recs = records(&actives, &inactives, 1);
        let split = AnalogClusterSplit::new(actives.clone(), inactives.clone(), 0.2, 5);
        let p = split.partition(&recs, &normalize(&recs)).unwrap();
        assert_eq!(p.train, vec![1, 2, 3, 4, 5, 6, 7, 8, 101, 102, 103, 104]);
        assert_eq!(p.test, vec![9, 10, 105]);
        assert_eq!(p.overlap(), 0);
    }
}
