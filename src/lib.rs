#![warn(missing_docs)]
//! cyp_dock_ml: leakage-controlled data partitioning and model sweeps for
//! docking-augmented CYP450 inhibition prediction.
//!
//! The crate turns per-isoform docking results into model-ready train/test
//! matrices and runs a battery of classifiers over them, one iteration per
//! (isoform, similarity threshold) pair:
//!
//! - **data_io**: readers for docked score tables, SMILES lists, analog
//!   cluster lists and Max-Tanimoto id tables; test-set snapshots
//! - **identity**: compound ids from molecule names, checked against the
//!   canonical SMILES reference
//! - **scoring**: `FittedScore`, replicate collapse and the docking-only AUC
//! - **partition**: analog-cluster and Max-Tanimoto splits, always disjoint at
//!   the compound level
//! - **features**, **balance**, **reduction**: feature views, SMOTE, PCA
//! - **models**: the `Trainer` contract plus built-in RF, KNN, LR and GB
//! - **pipeline**: the sweep itself, writing a wide results table and a run log
//!
//! # Quick examples
//!
//! ### Compound ids and the fitted score
//! ```
//! use cyp_dock_ml::{extract_compound_id, fitted_score};
//!
//! assert_eq!(extract_compound_id("858515_3"), Some(858515));
//! let s = fitted_score(-10.0, 50.0);
//! assert!((s - (-18.0)).abs() < 1e-12);
//! ```
//!
//! ### Run a sweep from a configuration file
//! ```no_run
//! use cyp_dock_ml::{Config, Pipeline};
//!
//! let config = Config::from_file("sweep.toml")?;
//! let ledger = Pipeline::new(config).run()?;
//! println!("{} iterations recorded", ledger.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod balance;
pub mod config;
pub mod data_io;
pub mod error;
pub mod features;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod partition;
pub mod pipeline;
pub mod records;
pub mod reduction;
pub mod results;
pub mod scoring;

// ─────────────────────────────────────────────────────────────────────────────
// Convenience re-exports
// ─────────────────────────────────────────────────────────────────────────────
pub use config::{Config, PartitionVariant};
pub use error::{ModelError, PipelineError, Result};
pub use features::{FeatureFrame, FeatureSchema, FeatureView};
pub use identity::extract_compound_id;
pub use models::{ModelKind, ModelRegistry, Trainer};
pub use partition::{Partition, PartitionStrategy};
pub use pipeline::Pipeline;
pub use records::{Activity, CompoundRecord};
pub use results::{MetricBlock, ResultColumn, ResultLedger};
pub use scoring::fitted_score;
