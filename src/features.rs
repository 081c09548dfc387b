//! Model-ready matrices and feature views.
//!
//! A [`FeatureFrame`] is the `(X, y)` pair for one side of a partition, with the
//! column names kept alongside so views can be sliced by name. Views:
//!
//! | code | view          | columns                                  |
//! |------|---------------|------------------------------------------|
//! | 0    | score only    | `RankScore`, `MatchScore` (schema `score`) |
//! | 1    | all           | score + ligand + docking                 |
//! | 2    | ligand only   | schema `ligand`                          |
//! | 3    | docking only  | schema `docking`                         |
//!
//! The column partition itself comes from configuration ([`FeatureSchema`]).
use std::str::FromStr;

use log::debug;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data_io::{MATCH_SCORE_COLUMN, RANK_SCORE_COLUMN};
use crate::error::{PipelineError, Result};
use crate::models::to_ndarrays;
use crate::records::CompoundRecord;

/// Named column subsets a model can be trained on.
///
/// In configuration files a view is written either by name (`"ligand_only"`)
/// or by its numeric code `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "ViewSpec")]
pub enum FeatureView {
    /// Code 0: the docking score columns only.
    ScoreOnly,
    /// Code 1: every feature column.
    All,
    /// Code 2: ligand descriptors only.
    LigandOnly,
    /// Code 3: docking interaction features only.
    DockingOnly,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ViewSpec {
    Code(u8),
    Name(String),
}

impl TryFrom<ViewSpec> for FeatureView {
    type Error = PipelineError;

    fn try_from(spec: ViewSpec) -> Result<Self> {
        match spec {
            ViewSpec::Code(code) => FeatureView::try_from(code),
            ViewSpec::Name(name) => name.parse(),
        }
    }
}

impl FromStr for FeatureView {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "score_only" => Ok(FeatureView::ScoreOnly),
            "all" => Ok(FeatureView::All),
            "ligand_only" => Ok(FeatureView::LigandOnly),
            "docking_only" => Ok(FeatureView::DockingOnly),
            other => Err(PipelineError::Config(format!("unknown feature view '{other}'"))),
        }
    }
}

impl TryFrom<u8> for FeatureView {
    type Error = PipelineError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FeatureView::ScoreOnly),
            1 => Ok(FeatureView::All),
            2 => Ok(FeatureView::LigandOnly),
            3 => Ok(FeatureView::DockingOnly),
            other => Err(PipelineError::Config(format!("unknown feature view {other}"))),
        }
    }
}

fn default_score_columns() -> Vec<String> {
    vec![RANK_SCORE_COLUMN.to_string(), MATCH_SCORE_COLUMN.to_string()]
}

/// Partition of an isoform's feature columns into score, ligand and docking groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Docking score columns.
    #[serde(default = "default_score_columns")]
    pub score: Vec<String>,
    /// Ligand descriptor columns.
    #[serde(default)]
    pub ligand: Vec<String>,
    /// Docking interaction columns.
    #[serde(default)]
    pub docking: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            score: default_score_columns(),
            ligand: Vec::new(),
            docking: Vec::new(),
        }
    }
}

impl FeatureSchema {
    fn wants(&self, view: FeatureView, column: &str) -> bool {
        let has = |list: &[String]| list.iter().any(|c| c == column);
        match view {
            FeatureView::ScoreOnly => has(&self.score),
            FeatureView::All => has(&self.score) || has(&self.ligand) || has(&self.docking),
            FeatureView::LigandOnly => has(&self.ligand),
            FeatureView::DockingOnly => has(&self.docking),
        }
    }
}

/// Feature matrix, aligned labels and column names.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    /// Column names, aligned with the columns of `x`.
    pub columns: Vec<String>,
    /// One row per replicate.
    pub x: Array2<f64>,
    /// Class labels, 1 for active.
    pub y: Array1<usize>,
}

impl FeatureFrame {
    /// Build from replicate rows; the compound id is not a column.
    pub fn from_records(columns: &[String], rows: &[&CompoundRecord]) -> Result<Self> {
        let descriptors: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
        let labels: Vec<usize> = rows.iter().map(|r| r.activity.class()).collect();
        let (x, y) = to_ndarrays(descriptors, labels)?;
        if x.ncols() != columns.len() {
            return Err(PipelineError::SchemaMismatch(format!(
                "{} feature values per row but {} column names",
                x.ncols(),
                columns.len()
            )));
        }
        Ok(Self {
            columns: columns.to_vec(),
            x,
            y,
        })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// `(negatives, positives)`
    pub fn class_counts(&self) -> (usize, usize) {
        let pos = self.y.iter().filter(|&&c| c == 1).count();
        (self.y.len() - pos, pos)
    }

    /// Slice the frame down to one view. Columns keep their frame order; columns
    /// the schema names but the frame lacks are skipped.
    ///
    /// Without a schema only the score-only and all views are available.
    pub fn select(&self, schema: Option<&FeatureSchema>, view: FeatureView) -> Result<FeatureFrame> {
        let fallback = FeatureSchema::default();
        let schema = match (schema, view) {
            (Some(s), _) => s,
            (None, FeatureView::All) => return Ok(self.clone()),
            (None, FeatureView::ScoreOnly) => &fallback,
            (None, other) => {
                return Err(PipelineError::SchemaMismatch(format!(
                    "view {other:?} needs a column schema"
                )))
            }
        };

        let idx: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| schema.wants(view, c))
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            return Err(PipelineError::SchemaMismatch(format!(
                "view {view:?} selects none of the {} available columns",
                self.columns.len()
            )));
        }
        debug!("view {view:?}: {} of {} columns", idx.len(), self.columns.len());

        Ok(FeatureFrame {
            columns: idx.iter().map(|&i| self.columns[i].clone()).collect(),
            x: self.x.select(Axis(1), &idx),
            y: self.y.clone(),
        })
    }
}

/// Apply one view to both sides and check they still agree.
pub fn select_pair(
    train: &FeatureFrame,
    test: &FeatureFrame,
    schema: Option<&FeatureSchema>,
    view: FeatureView,
) -> Result<(FeatureFrame, FeatureFrame)> {
    let train = train.select(schema, view)?;
    let test = test.select(schema, view)?;
    if train.columns != test.columns {
        return Err(PipelineError::SchemaMismatch(
            "train and test views select different columns".into(),
        ));
    }
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Activity;

    fn frame() -> FeatureFrame {
        let columns: Vec<String> = ["RankScore", "MatchScore", "MW", "Energy", "HBonds"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<CompoundRecord> = (0..4)
            .map(|i| CompoundRecord {
                compound_id: i,
                name: i.to_string(),
                activity: if i < 2 { Activity::Active } else { Activity::Inactive },
                rank_score: i as f64,
                match_score: 0.0,
                features: (0..5).map(|j| (i * 10 + j) as f64).collect(),
            })
            .collect();
        let refs: Vec<&CompoundRecord> = rows.iter().collect();
        FeatureFrame::from_records(&columns, &refs).unwrap()
    }

    fn schema() -> FeatureSchema {
        FeatureSchema {
            score: vec!["RankScore".into(), "MatchScore".into()],
            ligand: vec!["MW".into()],
            docking: vec!["Energy".into(), "HBonds".into(), "Absent".into()],
        }
    }

    #[test]
    fn view_codes() {
        assert_eq!(FeatureView::try_from(0u8).unwrap(), FeatureView::ScoreOnly);
        assert_eq!(FeatureView::try_from(3u8).unwrap(), FeatureView::DockingOnly);
        assert!(FeatureView::try_from(4u8).is_err());
        assert_eq!("ligand_only".parse::<FeatureView>().unwrap(), FeatureView::LigandOnly);
        assert!("ligand".parse::<FeatureView>().is_err());
    }

    #[test]
    fn frame_keeps_labels_and_counts() {
        let f = frame();
        assert_eq!(f.x.shape(), &[4, 5]);
        assert_eq!(f.class_counts(), (2, 2));
    }

    #[test]
    fn ligand_and_docking_views_slice_by_name() {
        let f = frame();
        let lig = f.select(Some(&schema()), FeatureView::LigandOnly).unwrap();
        assert_eq!(lig.columns, vec!["MW".to_string()]);
        assert_eq!(lig.x[[1, 0]], 12.0);

        let dock = f.select(Some(&schema()), FeatureView::DockingOnly).unwrap();
        assert_eq!(dock.columns, vec!["Energy".to_string(), "HBonds".to_string()]);
        assert_eq!(dock.y, f.y);
    }

    #[test]
    fn score_view_works_without_schema() {
        let f = frame();
        let s = f.select(None, FeatureView::ScoreOnly).unwrap();
        assert_eq!(s.columns, vec!["RankScore".to_string(), "MatchScore".to_string()]);
        assert!(f.select(None, FeatureView::LigandOnly).is_err());
    }

    #[test]
    fn pair_selection_matches_columns() {
        let f = frame();
        let (a, b) = select_pair(&f, &f, Some(&schema()), FeatureView::All).unwrap();
        assert_eq!(a.columns.len(), 5);
        assert_eq!(a.columns, b.columns);
    }
}
