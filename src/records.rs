//! Core data model: docked replicate rows and the canonical compound list.
//!
//! - [`RawRecord`]: one docked pose as read from a score file, before its
//!   compound id has been resolved.
//! - [`CompoundRecord`]: a resolved replicate row. Several rows share one
//!   `compound_id` (one per docking replicate).
//! - [`CanonicalTable`]: the authoritative id/SMILES/activity reference for an
//!   isoform. Read-only for the whole run.
//! - [`RecordSet`]: the working set of resolved rows plus the names of their
//!   feature columns, actives first.
use std::collections::HashSet;

/// Activity label of a compound against an isoform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Inhibitor of the isoform.
    Active,
    /// Non-inhibitor.
    Inactive,
}

impl Activity {
    /// Numeric label as written to CSV snapshots (1.0 / 0.0).
    pub fn label(self) -> f64 {
        match self {
            Activity::Active => 1.0,
            Activity::Inactive => 0.0,
        }
    }

    /// Class index handed to classifiers.
    pub fn class(self) -> usize {
        match self {
            Activity::Active => 1,
            Activity::Inactive => 0,
        }
    }

    /// Whether this is the active label.
    pub fn is_active(self) -> bool {
        self == Activity::Active
    }
}

/// A docked pose straight from a score file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Free-text molecule name, e.g. `"4239273_2"`.
    pub name: String,
    /// Docking rank score, lower is better.
    pub rank_score: f64,
    /// Raw match score of the pose.
    pub match_score: f64,
    /// Every non-name column, `NaN` where the cell was blank or non-numeric.
    pub features: Vec<f64>,
}

/// One docked score file (actives or inactives of one isoform).
#[derive(Debug, Clone)]
pub struct DockedTable {
    /// Label shared by every row.
    pub activity: Activity,
    /// Feature column names, aligned with `RawRecord::features`.
    pub columns: Vec<String>,
    /// Poses in file order.
    pub rows: Vec<RawRecord>,
}

/// A replicate row whose compound id has been resolved and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundRecord {
    /// Numeric id parsed from the name.
    pub compound_id: u64,
    /// Original molecule name.
    pub name: String,
    /// Activity label.
    pub activity: Activity,
    /// Docking rank score.
    pub rank_score: f64,
    /// Raw match score of the pose.
    pub match_score: f64,
    /// Feature values, aligned with `RecordSet::columns`.
    pub features: Vec<f64>,
}

/// One distinct chemical entity from a `.smi` reference list.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalCompound {
    /// Compound id.
    pub compound_id: u64,
    /// SMILES string.
    pub smiles: String,
    /// List the compound came from.
    pub activity: Activity,
}

/// Authoritative id/activity reference for one isoform.
#[derive(Debug, Clone, Default)]
pub struct CanonicalTable {
    compounds: Vec<CanonicalCompound>,
    actives: HashSet<u64>,
    inactives: HashSet<u64>,
}

impl CanonicalTable {
    /// Index the compounds by activity.
    pub fn new(compounds: Vec<CanonicalCompound>) -> Self {
        let mut actives = HashSet::new();
        let mut inactives = HashSet::new();
        for c in &compounds {
            match c.activity {
                Activity::Active => actives.insert(c.compound_id),
                Activity::Inactive => inactives.insert(c.compound_id),
            };
        }
        Self {
            compounds,
            actives,
            inactives,
        }
    }

    /// Whether `id` is listed under the given activity label.
    pub fn contains(&self, id: u64, activity: Activity) -> bool {
        match activity {
            Activity::Active => self.actives.contains(&id),
            Activity::Inactive => self.inactives.contains(&id),
        }
    }

    /// Compounds in file order.
    pub fn compounds(&self) -> &[CanonicalCompound] {
        &self.compounds
    }

    /// Number of listed compounds.
    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    /// Whether no compound was listed.
    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }
}

/// Resolved replicate rows of one isoform, actives before inactives.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    /// Feature column names.
    pub columns: Vec<String>,
    /// Replicate rows, actives first.
    pub records: Vec<CompoundRecord>,
}

impl RecordSet {
    /// Number of replicate rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no row survived.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows carrying `activity`.
    pub fn count(&self, activity: Activity) -> usize {
        self.records.iter().filter(|r| r.activity == activity).count()
    }

    /// Remove the named columns if present. Returns the ones actually removed.
    pub fn drop_columns(&mut self, names: &[String]) -> Vec<String> {
        let keep: Vec<bool> = self.columns.iter().map(|c| !names.contains(c)).collect();
        self.retain_columns(&keep)
    }

    /// Remove every column holding a missing value in any row.
    pub fn drop_incomplete_columns(&mut self) -> Vec<String> {
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|j| {
                self.records
                    .iter()
                    .all(|r| r.features.get(j).is_some_and(|v| v.is_finite()))
            })
            .collect();
        self.retain_columns(&keep)
    }

    fn retain_columns(&mut self, keep: &[bool]) -> Vec<String> {
        let dropped: Vec<String> = self
            .columns
            .iter()
            .zip(keep)
            .filter(|(_, &k)| !k)
            .map(|(c, _)| c.clone())
            .collect();
        if dropped.is_empty() {
            return dropped;
        }
        self.columns = self
            .columns
            .iter()
            .zip(keep)
            .filter(|(_, &k)| k)
            .map(|(c, _)| c.clone())
            .collect();
        for rec in &mut self.records {
            rec.features = rec
                .features
                .iter()
                .zip(keep)
                .filter(|(_, &k)| k)
                .map(|(v, _)| *v)
                .collect();
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: u64, features: Vec<f64>) -> CompoundRecord {
        CompoundRecord {
            compound_id: id,
            name: format!("{id}_1"),
            activity: Activity::Active,
            rank_score: 0.0,
            match_score: 0.0,
            features,
        }
    }

    #[test]
    fn canonical_lookup_respects_activity() {
        let table = CanonicalTable::new(vec![
            CanonicalCompound {
                compound_id: 7,
                smiles: "CCO".into(),
                activity: Activity::Active,
            },
            CanonicalCompound {
                compound_id: 9,
                smiles: "c1ccccc1".into(),
                activity: Activity::Inactive,
            },
        ]);
        assert!(table.contains(7, Activity::Active));
        assert!(!table.contains(7, Activity::Inactive));
        assert!(table.contains(9, Activity::Inactive));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn incomplete_columns_are_dropped_everywhere() {
        let mut set = RecordSet {
            columns: vec!["RankScore".into(), "Gap".into(), "Energy".into()],
            records: vec![
                rec(1, vec![1.0, f64::NAN, 3.0]),
                rec(2, vec![4.0, 5.0, 6.0]),
            ],
        };
        let dropped = set.drop_incomplete_columns();
        assert_eq!(dropped, vec!["Gap".to_string()]);
        assert_eq!(set.columns, vec!["RankScore".to_string(), "Energy".to_string()]);
        assert_eq!(set.records[0].features, vec![1.0, 3.0]);
        assert_eq!(set.records[1].features, vec![4.0, 6.0]);
    }

    #[test]
    fn named_columns_are_dropped() {
        let mut set = RecordSet {
            columns: vec!["RankScore".into(), "Conformer".into()],
            records: vec![rec(1, vec![1.0, 2.0])],
        };
        let dropped = set.drop_columns(&["Conformer".to_string(), "absent".to_string()]);
        assert_eq!(dropped, vec!["Conformer".to_string()]);
        assert_eq!(set.records[0].features, vec![1.0]);
    }
}
