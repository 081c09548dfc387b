//! Result ledger and run log.
//!
//! Every (isoform, threshold) iteration produces one [`ResultColumn`], an
//! ordered list of named [`MetricBlock`]s. The [`ResultLedger`] keeps columns
//! in sweep order and flattens them into a wide CSV: `block`, `metric`, then
//! one column per iteration. Rows are the union of `(block, metric)` pairs in
//! first-seen order; cells an iteration never produced are left empty.
//!
//! The [`RunLog`] is the append-only text companion to the table.
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::error::Result;

/// One named group of metrics, e.g. `RF` or `Data Sizes`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBlock {
    /// Block name, the first column of the results table.
    pub name: String,
    /// Metric name/value pairs in insertion order.
    pub entries: Vec<(String, String)>,
}

impl MetricBlock {
    /// Block with the given entries.
    pub fn new(name: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Sentinel for a model that raised during fit or scoring.
    pub fn failed(name: impl Into<String>, error: impl ToString) -> Self {
        Self::new(
            name,
            vec![
                ("status".into(), "failed".into()),
                ("error".into(), error.to_string()),
            ],
        )
    }

    /// Sentinel for an enabled model with no trainer behind it.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self::new(name, vec![("status".into(), "unavailable".into())])
    }

    /// Value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// All blocks recorded for one iteration, keyed by `"{isoform}-{threshold}"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    /// Column header, `{isoform}-{threshold}`.
    pub name: String,
    /// Blocks in recording order.
    pub blocks: Vec<MetricBlock>,
}

impl ResultColumn {
    /// Empty column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    /// Placeholder column for an iteration that could not run.
    pub fn skipped(name: impl Into<String>, reason: impl ToString) -> Self {
        let mut col = Self::new(name);
        col.push(MetricBlock::new(
            "Status",
            vec![
                ("status".into(), "skipped".into()),
                ("reason".into(), reason.to_string()),
            ],
        ));
        col
    }

    /// Append a block.
    pub fn push(&mut self, block: MetricBlock) {
        self.blocks.push(block);
    }

    /// First block called `name`.
    pub fn block(&self, name: &str) -> Option<&MetricBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Value of `key` inside block `block`.
    pub fn value(&self, block: &str, key: &str) -> Option<&str> {
        self.block(block).and_then(|b| b.get(key))
    }

    /// Plain-text rendering for the run log.
    pub fn render(&self) -> String {
        let mut out = format!("[{}]\n", self.name);
        for block in &self.blocks {
            out.push_str(&format!("  {}\n", block.name));
            for (k, v) in &block.entries {
                out.push_str(&format!("    {k}: {v}\n"));
            }
        }
        out
    }
}

/// Columns in sweep order.
#[derive(Debug, Clone, Default)]
pub struct ResultLedger {
    columns: Vec<ResultColumn>,
}

impl ResultLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished iteration.
    pub fn push(&mut self, column: ResultColumn) {
        self.columns.push(column);
    }

    /// Columns in sweep order.
    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `(block, metric)` row keys in first-seen order.
    pub fn row_keys(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for col in &self.columns {
            for block in &col.blocks {
                for (k, _) in &block.entries {
                    let key = (block.name.clone(), k.clone());
                    if seen.insert(key.clone()) {
                        keys.push(key);
                    }
                }
            }
        }
        keys
    }

    /// Write the wide table to any writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["block".to_string(), "metric".to_string()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        wtr.write_record(&header)?;

        for (block, metric) in self.row_keys() {
            let mut row = vec![block.clone(), metric.clone()];
            row.extend(
                self.columns
                    .iter()
                    .map(|c| c.value(&block, &metric).unwrap_or_default().to_string()),
            );
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Overwrite `path` with the current table.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        self.write_csv(io::BufWriter::new(file))?;
        info!("results table ({} columns) -> {}", self.len(), path.display());
        Ok(())
    }
}

/// Append-only text log of one sweep.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl RunLog {
    /// Open (or create) the log and write the start banner.
    pub fn start<P: Into<PathBuf>>(path: P, project: &str) -> Result<Self> {
        let log = Self { path: path.into() };
        if let Some(parent) = log.path.parent() {
            fs::create_dir_all(parent)?;
        }
        log.append(&format!("==== {project} ====\nstart: {}\n", timestamp()))?;
        Ok(log)
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line.
    pub fn append(&self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{text}")?;
        Ok(())
    }

    /// Append the rendered blocks of a column.
    pub fn column(&self, column: &ResultColumn) -> Result<()> {
        self.append(&column.render())
    }

    /// End timestamp followed by the full table.
    pub fn finish(&self, ledger: &ResultLedger) -> Result<()> {
        let mut table = Vec::new();
        ledger.write_csv(&mut table)?;
        self.append(&format!(
            "end: {}\n{}",
            timestamp(),
            String::from_utf8_lossy(&table)
        ))
    }
}
