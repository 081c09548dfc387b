//! Error types shared across the pipeline.
//!
//! `PipelineError` covers everything a sweep can hit, from unreadable input
//! files to degenerate partitions. Errors are split into two families:
//!
//! - **iteration-local**: the current isoform/threshold combination cannot be
//!   evaluated (a cluster file is missing, the partition came out empty, ...).
//!   The sweep records a gap for it and moves on.
//! - **fatal**: configuration problems and failures to persist results.
//!   These abort the sweep; completed isoforms are already on disk.
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading inputs, partitioning, or assembling matrices.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem error while persisting output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A results or snapshot CSV could not be written.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The configuration is inconsistent or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An expected input file does not exist.
    #[error("missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    /// An input file exists but its content is unusable.
    #[error("malformed input {}: {message}", path.display())]
    MalformedInput {
        /// File being parsed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Train or test partition is unusable for model fitting.
    #[error("degenerate partition for {data_set}: {message}")]
    DegeneratePartition {
        /// `{isoform}-{threshold}` label.
        data_set: String,
        /// Which side is empty or single-class.
        message: String,
    },

    /// Feature columns requested by a view are not present in the matrix.
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Size normalisation asked for more rows than the table holds.
    #[error("cannot sample {requested} rows from a table of {available}")]
    InsufficientRows {
        /// Configured reference size.
        requested: usize,
        /// Rows actually present.
        available: usize,
    },

    /// A leakage invariant was violated after partitioning.
    #[error("train and test share {0} compound id(s)")]
    Leakage(usize),

    /// A model collaborator failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PipelineError {
    /// Whether the sweep may record a gap and continue with the next iteration.
    pub fn is_iteration_local(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingInput(_)
                | PipelineError::MalformedInput { .. }
                | PipelineError::DegeneratePartition { .. }
                | PipelineError::SchemaMismatch(_)
                | PipelineError::InsufficientRows { .. }
                | PipelineError::Model(_)
        )
    }
}

/// Errors raised by classifier collaborators.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Input matrices have inconsistent shapes.
    #[error("shape error: {0}")]
    Shape(String),

    /// The underlying fitting routine failed.
    #[error("fit failed for {model}: {message}")]
    Fit {
        /// Model label, e.g. `RF`.
        model: String,
        /// Message from the fitting routine.
        message: String,
    },

    /// The model is enabled but no trainer is registered for it.
    #[error("no trainer registered for {0}")]
    Unavailable(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_and_empty_partitions_do_not_abort_the_sweep() {
        assert!(PipelineError::MissingInput(PathBuf::from("x.txt")).is_iteration_local());
        assert!(PipelineError::DegeneratePartition {
            data_set: "3A4-30".into(),
            message: "empty test set".into(),
        }
        .is_iteration_local());
        assert!(!PipelineError::Config("bad".into()).is_iteration_local());
        assert!(!PipelineError::Leakage(2).is_iteration_local());
    }

    #[test]
    fn csv_errors_are_not_prefixed_twice() {
        let mut rdr = csv::Reader::from_reader("a,b\n1\n".as_bytes());
        let csv_err = rdr.records().find_map(|r| r.err()).unwrap();
        let expected = csv_err.to_string();
        let err = PipelineError::from(csv_err);
        assert_eq!(err.to_string(), expected);
        assert!(!err.to_string().contains("CSV error: CSV error"));
    }
}
