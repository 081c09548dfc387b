//! Leakage-controlled train/test partitioning.
//!
//! A [`PartitionStrategy`] turns the resolved replicate rows of one isoform into
//! two disjoint sets of compound ids for one similarity threshold:
//!
//! - [`analog::AnalogClusterSplit`]: precomputed analog cluster lists, with a
//!   positional split inside actives and inactives and per-compound replicate
//!   truncation.
//! - [`max_tanimoto::MaxTanimotoSplit`]: precomputed train/test id tables whose
//!   maximum train–test Tanimoto similarity is bounded by the threshold.
//!
//! Both variants work at the compound level. [`replicates::expand`] then maps
//! the id sets back onto replicate rows, which is what the models train on.
use std::collections::{HashMap, HashSet};

use crate::config::{Config, PartitionVariant};
use crate::data_io::{read_id_list, read_id_table, InputLayout};
use crate::error::{PipelineError, Result};
use crate::records::{Activity, CompoundRecord};
use crate::scoring::Normalized;

pub mod analog;
pub mod max_tanimoto;
pub mod replicates;

pub use analog::AnalogClusterSplit;
pub use max_tanimoto::MaxTanimotoSplit;

/// How many replicate rows of each compound survive re-expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicateQuota {
    /// Every replicate row is kept.
    All,
    /// Keep the first `n` rows of each listed compound.
    PerCompound(HashMap<u64, usize>),
}

impl ReplicateQuota {
    /// Rows of `id` allowed through re-expansion.
    pub fn limit(&self, id: u64) -> usize {
        match self {
            ReplicateQuota::All => usize::MAX,
            ReplicateQuota::PerCompound(map) => map.get(&id).copied().unwrap_or(0),
        }
    }
}

/// Disjoint train/test compound ids for one isoform × threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Training compound ids.
    pub train: Vec<u64>,
    /// Test compound ids.
    pub test: Vec<u64>,
    /// Replicate rows kept per compound.
    pub quota: ReplicateQuota,
}

impl Partition {
    /// Number of compound ids present on both sides.
    pub fn overlap(&self) -> usize {
        let test: HashSet<u64> = self.test.iter().copied().collect();
        self.train.iter().filter(|id| test.contains(id)).count()
    }

    /// Fail with [`PipelineError::Leakage`] when an id sits on both sides.
    pub fn ensure_disjoint(&self) -> Result<()> {
        match self.overlap() {
            0 => Ok(()),
            n => Err(PipelineError::Leakage(n)),
        }
    }

    /// Replicate rows for the train and test sides, in input row order.
    pub fn expand<'a>(
        &self,
        records: &'a [CompoundRecord],
    ) -> (Vec<&'a CompoundRecord>, Vec<&'a CompoundRecord>) {
        (
            replicates::expand(records, &self.train, &self.quota),
            replicates::expand(records, &self.test, &self.quota),
        )
    }
}

/// A similarity-control strategy producing a compound-level split.
pub trait PartitionStrategy {
    /// Short label used in logs and snapshot file names.
    fn label(&self) -> &'static str;

    /// Split the resolved rows of one isoform.
    ///
    /// `records` holds every replicate (actives first); `normalized` holds one
    /// representative per compound.
    fn partition(&self, records: &[CompoundRecord], normalized: &Normalized) -> Result<Partition>;

    /// File name of the persisted test-set snapshot.
    fn snapshot_file(&self, isoform: &str, threshold: u32) -> String {
        format!("{}_{isoform}_{threshold}.csv", self.label())
    }
}

/// Read the external membership files for one iteration and build the
/// configured strategy.
pub fn load_strategy(
    config: &Config,
    layout: &InputLayout,
    isoform: &str,
    threshold: u32,
) -> Result<Box<dyn PartitionStrategy>> {
    match config.partition {
        PartitionVariant::AnalogCluster => {
            let actives = read_id_list(layout.analog_cluster_list(isoform, Activity::Active, threshold))?;
            let inactives =
                read_id_list(layout.analog_cluster_list(isoform, Activity::Inactive, threshold))?;
            Ok(Box::new(AnalogClusterSplit::new(
                actives,
                inactives,
                config.test_size,
                config.max_replicates,
            )))
        }
        PartitionVariant::MaxTanimoto => {
            let train = read_id_table(layout.max_tc_train_table(isoform, threshold))?;
            let test = read_id_table(layout.max_tc_test_table(isoform))?;
            let mut split = MaxTanimotoSplit::new(train, test);
            if let Some(size) = config.reference_size(isoform) {
                split = split.with_reference_size(size, config.seed)?;
            }
            Ok(Box::new(split))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_counted_on_compound_ids() {
        let p = Partition {
            train: vec![1, 2, 3],
            test: vec![3, 4],
            quota: ReplicateQuota::All,
        };
        assert_eq!(p.overlap(), 1);
        assert!(matches!(p.ensure_disjoint(), Err(PipelineError::Leakage(1))));
    }

    #[test]
    fn unlisted_ids_get_no_replicates() {
        let quota = ReplicateQuota::PerCompound(HashMap::from([(5, 2)]));
        assert_eq!(quota.limit(5), 2);
        assert_eq!(quota.limit(6), 0);
        assert_eq!(ReplicateQuota::All.limit(6), usize::MAX);
    }
}
