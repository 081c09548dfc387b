//! Max train–test Tanimoto partitioning.
//!
//! The split is precomputed outside the pipeline: a test-set id table per
//! isoform (shared by every threshold) and a train-set id table per isoform and
//! threshold, built so that no training compound exceeds the threshold's
//! Tanimoto similarity to any test compound. This strategy only joins those
//! tables against the resolved compounds.
//!
//! With size normalisation on, the train table is downsampled (without
//! replacement, fixed seed) to a per-isoform reference size, so that the effect
//! of the threshold is not confounded with the training-set size.
use std::collections::HashSet;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{Partition, PartitionStrategy, ReplicateQuota};
use crate::error::{PipelineError, Result};
use crate::records::CompoundRecord;
use crate::scoring::Normalized;

/// Max-Tanimoto strategy for one isoform × threshold.
#[derive(Debug, Clone)]
pub struct MaxTanimotoSplit {
    train_table: Vec<u64>,
    test_table: Vec<u64>,
}

impl MaxTanimotoSplit {
    /// Duplicate ids in the test table are dropped (first kept).
    pub fn new(train_table: Vec<u64>, test_table: Vec<u64>) -> Self {
        let mut seen = HashSet::new();
        let test_table = test_table.into_iter().filter(|id| seen.insert(*id)).collect();
        Self {
            train_table,
            test_table,
        }
    }

    /// Downsample the train table to exactly `size` rows.
    pub fn with_reference_size(mut self, size: usize, seed: u64) -> Result<Self> {
        let available = self.train_table.len();
        if size > available {
            return Err(PipelineError::InsufficientRows {
                requested: size,
                available,
            });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, available, size).into_vec();
        picked.sort_unstable();
        self.train_table = picked.into_iter().map(|i| self.train_table[i]).collect();
        info!("train table downsampled to {size} of {available} rows");
        Ok(self)
    }

    /// Ids of the training table, after any downsampling.
    pub fn train_table(&self) -> &[u64] {
        &self.train_table
    }

    /// Deduplicated test ids.
    pub fn test_table(&self) -> &[u64] {
        &self.test_table
    }
}

impl PartitionStrategy for MaxTanimotoSplit {
    fn label(&self) -> &'static str {
        "max_tc"
    }

    fn partition(&self, _records: &[CompoundRecord], normalized: &Normalized) -> Result<Partition> {
        let train_ids: HashSet<u64> = self.train_table.iter().copied().collect();
        let test_ids: HashSet<u64> = self.test_table.iter().copied().collect();

        let mut train = Vec::new();
        let mut test = Vec::new();
        let mut leaked = 0usize;
        for rep in &normalized.representatives {
            let id = rep.compound_id;
            match (train_ids.contains(&id), test_ids.contains(&id)) {
                (true, true) => {
                    leaked += 1;
                    test.push(id);
                }
                (false, true) => test.push(id),
                (true, false) => train.push(id),
                (false, false) => {}
            }
        }
        if leaked > 0 {
            warn!("{leaked} compound(s) listed in both train and test tables, kept in test only");
        }
        info!("max Tanimoto split: {} train, {} test compounds", train.len(), test.len());

        Ok(Partition {
            train,
            test,
            quota: ReplicateQuota::All,
        })
    }
}
