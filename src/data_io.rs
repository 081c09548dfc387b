//! File readers and writers for the sweep's inputs and audit outputs.
//!
//! All readers come in two flavours, like the descriptor loaders they grew out
//! of: one taking a filesystem path and one taking any `std::io::Read` (handy for
//! tests and in-memory data). The reader flavour takes a `source` path that is
//! only used to label errors.
//!
//! Input layout below `data_dir` is described by [`InputLayout`].
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::records::{Activity, CanonicalCompound, CompoundRecord, DockedTable, RawRecord};

/// Column holding the composite rank component in docked score files.
pub const RANK_SCORE_COLUMN: &str = "RankScore";
/// Column holding the match component in docked score files.
pub const MATCH_SCORE_COLUMN: &str = "MatchScore";

/// Locations of every input file for a given isoform/threshold.
#[derive(Debug, Clone)]
pub struct InputLayout {
    root: PathBuf,
}

impl InputLayout {
    /// Layout rooted at the data directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Results_CSV/{ISO}/{ISO}-docked-{actives|inactives}-scored.csv`
    pub fn docked_scores(&self, isoform: &str, activity: Activity) -> PathBuf {
        let kind = match activity {
            Activity::Active => "actives",
            Activity::Inactive => "inactives",
        };
        self.root
            .join("Results_CSV")
            .join(isoform)
            .join(format!("{isoform}-docked-{kind}-scored.csv"))
    }

    /// `Smiles/{ISO}-{active|inactive}.smi`
    pub fn smiles_list(&self, isoform: &str, activity: Activity) -> PathBuf {
        let kind = match activity {
            Activity::Active => "active",
            Activity::Inactive => "inactive",
        };
        self.root.join("Smiles").join(format!("{isoform}-{kind}.smi"))
    }

    /// `Analog_Clusters/cluster_list_{iso}-{actives|inactives}_{T}.txt`, isoform lower-cased.
    pub fn analog_cluster_list(&self, isoform: &str, activity: Activity, threshold: u32) -> PathBuf {
        let kind = match activity {
            Activity::Active => "actives",
            Activity::Inactive => "inactives",
        };
        self.root.join("Analog_Clusters").join(format!(
            "cluster_list_{}-{kind}_{threshold}.txt",
            isoform.to_lowercase()
        ))
    }

    /// `Clusters_Max_TC/train_set_{ISO}_{T/100}.csv`
    pub fn max_tc_train_table(&self, isoform: &str, threshold: u32) -> PathBuf {
        self.root.join("Clusters_Max_TC").join(format!(
            "train_set_{isoform}_{}.csv",
            threshold_fraction(threshold)
        ))
    }

    /// `Clusters_Max_TC/test_set_{ISO}.csv` (threshold independent)
    pub fn max_tc_test_table(&self, isoform: &str) -> PathBuf {
        self.root
            .join("Clusters_Max_TC")
            .join(format!("test_set_{isoform}.csv"))
    }
}

/// Render an integer percent as the decimal fraction used in file names
/// (`30` → `"0.3"`, `100` → `"1.0"`).
pub fn threshold_fraction(threshold: u32) -> String {
    format!("{:?}", f64::from(threshold) / 100.0)
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    File::open(path).map_err(|e| unreadable(path, e))
}

fn malformed(path: &Path, message: impl Into<String>) -> PipelineError {
    PipelineError::MalformedInput {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Read-side csv or I/O failure inside an input file.
fn unreadable(path: &Path, err: impl Display) -> PipelineError {
    malformed(path, err.to_string())
}

/// Read a docked score table.
///
/// - `name_column` is the free-text molecule name header.
/// - `limit` keeps only the first `n` data rows (debug subsampling).
///
/// Every other column becomes a feature column; blank or non-numeric cells are
/// stored as `NaN` so they can be dropped column-wise later. `RankScore` and
/// `MatchScore` must be present.
pub fn read_docked_table<P: AsRef<Path>>(
    path: P,
    activity: Activity,
    name_column: &str,
    limit: Option<usize>,
) -> Result<DockedTable> {
    let path = path.as_ref();
    let file = open(path)?;
    read_docked_table_from_reader(file, path, activity, name_column, limit)
}

/// Reader flavour of [`read_docked_table`].
pub fn read_docked_table_from_reader(
    reader: impl Read,
    source: &Path,
    activity: Activity,
    name_column: &str,
    limit: Option<usize>,
) -> Result<DockedTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(|e| unreadable(source, e))?.clone();

    let name_idx = headers
        .iter()
        .position(|h| h.trim() == name_column)
        .ok_or_else(|| malformed(source, format!("name column '{name_column}' not found")))?;

    // Map every remaining header to a feature slot
    let feature_idxs: Vec<usize> = (0..headers.len()).filter(|&i| i != name_idx).collect();
    let columns: Vec<String> = feature_idxs
        .iter()
        .map(|&i| headers[i].trim().to_string())
        .collect();
    let slot = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| malformed(source, format!("column '{name}' not found")))
    };
    let rank_slot = slot(RANK_SCORE_COLUMN)?;
    let match_slot = slot(MATCH_SCORE_COLUMN)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        if limit.is_some_and(|n| rows.len() >= n) {
            break;
        }
        let record = result.map_err(|e| unreadable(source, e))?;
        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        let features: Vec<f64> = feature_idxs
            .iter()
            .map(|&i| {
                record
                    .get(i)
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .unwrap_or(f64::NAN)
            })
            .collect();
        rows.push(RawRecord {
            name,
            rank_score: features[rank_slot],
            match_score: features[match_slot],
            features,
        });
    }

    Ok(DockedTable {
        activity,
        columns,
        rows,
    })
}

/// Read a whitespace-separated `id smiles` list with no header.
pub fn read_smiles_list<P: AsRef<Path>>(path: P, activity: Activity) -> Result<Vec<CanonicalCompound>> {
    let path = path.as_ref();
    let file = open(path)?;
    read_smiles_list_from_reader(file, path, activity)
}

/// Reader flavour of [`read_smiles_list`].
pub fn read_smiles_list_from_reader(
    reader: impl Read,
    source: &Path,
    activity: Activity,
) -> Result<Vec<CanonicalCompound>> {
    let mut out = Vec::new();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|e| unreadable(source, e))?;
        let mut parts = line.split_whitespace();
        let Some(id) = parts.next() else { continue };
        let compound_id = parse_id(id)
            .ok_or_else(|| malformed(source, format!("line {}: bad id '{id}'", lineno + 1)))?;
        let smiles = parts.next().unwrap_or("").to_string();
        out.push(CanonicalCompound {
            compound_id,
            smiles,
            activity,
        });
    }
    Ok(out)
}

/// Read a newline-delimited compound id list (analog cluster membership).
pub fn read_id_list<P: AsRef<Path>>(path: P) -> Result<Vec<u64>> {
    let path = path.as_ref();
    let file = open(path)?;
    read_id_list_from_reader(file, path)
}

/// Reader flavour of [`read_id_list`].
pub fn read_id_list_from_reader(reader: impl Read, source: &Path) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|e| unreadable(source, e))?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let id = parse_id(token)
            .ok_or_else(|| malformed(source, format!("line {}: bad id '{token}'", lineno + 1)))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Read the `id` column of a Max-Tanimoto train/test table, in file order.
pub fn read_id_table<P: AsRef<Path>>(path: P) -> Result<Vec<u64>> {
    let path = path.as_ref();
    let file = open(path)?;
    read_id_table_from_reader(file, path)
}

/// Reader flavour of [`read_id_table`].
pub fn read_id_table_from_reader(reader: impl Read, source: &Path) -> Result<Vec<u64>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(|e| unreadable(source, e))?.clone();
    let id_idx = headers
        .iter()
        .position(|h| h.trim() == "id")
        .ok_or_else(|| malformed(source, "column 'id' not found"))?;

    let mut ids = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| unreadable(source, e))?;
        let raw = record.get(id_idx).unwrap_or("").trim();
        let id = parse_id(raw)
            .ok_or_else(|| malformed(source, format!("row {}: bad id '{raw}'", row + 1)))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Accepts `123` as well as `123.0` (tables written from float columns).
fn parse_id(token: &str) -> Option<u64> {
    if let Ok(id) = token.parse::<u64>() {
        return Some(id);
    }
    let v: f64 = token.parse().ok()?;
    (v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64).then_some(v as u64)
}

/// Write replicate rows as a CSV snapshot: `id`, name, `Activity`, then features.
pub fn write_partition_csv<P: AsRef<Path>>(
    path: P,
    name_column: &str,
    columns: &[String],
    rows: &[&CompoundRecord],
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["id".to_string(), name_column.to_string(), "Activity".to_string()];
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)?;

    for rec in rows {
        let mut line = vec![
            rec.compound_id.to_string(),
            rec.name.clone(),
            rec.activity.label().to_string(),
        ];
        line.extend(rec.features.iter().map(|v| v.to_string()));
        wtr.write_record(&line)?;
    }
    wtr.flush()?;
    Ok(())
}
