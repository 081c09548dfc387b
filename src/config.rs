//! Sweep configuration.
//!
//! A single immutable [`Config`] is parsed from TOML once at startup, validated,
//! and then passed by reference to every stage. Nothing mutates it mid-run.
//!
//! ```
//! use cyp_dock_ml::config::{Config, PartitionVariant};
//!
//! let cfg = Config::from_toml_str(r#"
//!     project_name = "demo"
//!     data_dir = "data"
//!     isoforms = ["3A4"]
//!     thresholds = [50, 30]
//!     partition = "analog_cluster"
//! "#).unwrap();
//! assert_eq!(cfg.partition, PartitionVariant::AnalogCluster);
//! assert_eq!(cfg.sweep_thresholds(), vec![30, 50]);
//! ```
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::features::{FeatureSchema, FeatureView};

/// Which similarity-control strategy builds the train/test split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionVariant {
    /// Precomputed analog cluster lists, positional split.
    AnalogCluster,
    /// Precomputed max train-test Tanimoto tables.
    MaxTanimoto,
}

/// Per-model enable flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelToggles {
    /// Random forest.
    #[serde(default = "default_true")]
    pub rf: bool,
    /// k-nearest neighbours.
    #[serde(default = "default_true")]
    pub knn: bool,
    /// Logistic regression.
    #[serde(default = "default_true")]
    pub lr: bool,
    /// Neural network; no built-in trainer, register one to use it.
    #[serde(default)]
    pub dnn: bool,
    /// Gradient boosting.
    #[serde(default = "default_true")]
    pub gb: bool,
    /// XGBoost; no built-in trainer, register one to use it.
    #[serde(default)]
    pub xgb: bool,
    /// Run XGB once per feature view and record each view separately.
    #[serde(default)]
    pub xgb_feature_sweep: bool,
}

impl Default for ModelToggles {
    fn default() -> Self {
        Self {
            rf: true,
            knn: true,
            lr: true,
            dnn: false,
            gb: true,
            xgb: false,
            xgb_feature_sweep: false,
        }
    }
}

/// Hyperparameter search toggle and budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Run a random search before the final fit.
    #[serde(default)]
    pub enabled: bool,
    /// Candidates sampled per model.
    #[serde(default = "default_max_evals")]
    pub max_evals: usize,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_evals: default_max_evals(),
        }
    }
}

/// Optional PCA on the model-ready matrices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Project both frames onto the leading components.
    #[serde(default)]
    pub enabled: bool,
    /// Number of principal components kept.
    #[serde(default = "default_pca_components")]
    pub components: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            components: default_pca_components(),
        }
    }
}

/// Debug subsampling: read only the head of each docked table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsampleConfig {
    /// Read only the first `size` rows of each docked table.
    #[serde(default)]
    pub enabled: bool,
    /// Rows kept per table.
    #[serde(default = "default_subsample_size")]
    pub size: usize,
}

impl Default for SubsampleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size: default_subsample_size(),
        }
    }
}

/// Max-Tanimoto size normalisation.
///
/// The reference sizes are the training-set sizes observed at the 0.3
/// similarity cut-off, where the AUC drop-off levels out. They are empirical
/// constants, not derived from anything else in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SameSizeConfig {
    /// Downsample Max-Tanimoto train tables to the reference size.
    #[serde(default)]
    pub enabled: bool,
    /// Reference training-set size per isoform.
    #[serde(default = "default_reference_sizes")]
    pub sizes: BTreeMap<String, usize>,
}

impl Default for SameSizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sizes: default_reference_sizes(),
        }
    }
}

/// Feature column partition, with optional per-isoform overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema used when an isoform has no override.
    #[serde(default)]
    pub default: Option<FeatureSchema>,
    /// Per-isoform overrides.
    #[serde(default)]
    pub isoforms: BTreeMap<String, FeatureSchema>,
}

/// Top-level sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Label for the run log banner and result files.
    pub project_name: String,
    /// Root of the input tree (`Results_CSV/`, `Smiles/`, ...).
    pub data_dir: PathBuf,
    /// Where the results table, run log and test-set snapshots go.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Isoforms to sweep, in order.
    pub isoforms: Vec<String>,
    /// Similarity thresholds in integer percent.
    pub thresholds: Vec<u32>,
    /// Seed for every RNG in the run.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Test fraction for the analog-cluster split.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Partitioning strategy.
    pub partition: PartitionVariant,
    /// `None` keeps every usable feature column.
    #[serde(default)]
    pub feature_view: Option<FeatureView>,
    /// Docking replicates per compound in the raw score files.
    #[serde(default = "default_max_replicates")]
    pub max_replicates: usize,
    /// Column holding the molecule name in docked tables.
    #[serde(default = "default_name_column")]
    pub name_column: String,
    /// Columns that are never features (free text, bookkeeping).
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Which classifiers run.
    #[serde(default)]
    pub models: ModelToggles,
    /// Hyperparameter search.
    #[serde(default)]
    pub tuning: TuningConfig,
    /// PCA settings.
    #[serde(default)]
    pub pca: PcaConfig,
    /// Debug subsampling.
    #[serde(default)]
    pub subsample: SubsampleConfig,
    /// Same-size normalisation.
    #[serde(default)]
    pub same_size: SameSizeConfig,
    /// Feature column groups.
    #[serde(default)]
    pub schema: SchemaConfig,
}

fn default_true() -> bool {
    true
}

fn default_max_evals() -> usize {
    30
}

fn default_pca_components() -> usize {
    10
}

fn default_subsample_size() -> usize {
    1000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_seed() -> u64 {
    1
}

fn default_test_size() -> f64 {
    0.2
}

fn default_max_replicates() -> usize {
    5
}

fn default_name_column() -> String {
    "Molecule Name".to_string()
}

fn default_reference_sizes() -> BTreeMap<String, usize> {
    [
        ("1A2", 2406),
        ("2C9", 2622),
        ("2C19", 2698),
        ("2D6", 2789),
        ("3A4", 2649),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(PipelineError::Config("project_name is empty".into()));
        }
        if self.isoforms.is_empty() {
            return Err(PipelineError::Config("no isoforms to sweep".into()));
        }
        if self.thresholds.is_empty() {
            return Err(PipelineError::Config("no similarity thresholds to sweep".into()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.max_replicates == 0 {
            return Err(PipelineError::Config("max_replicates must be at least 1".into()));
        }
        if self.pca.enabled && self.pca.components == 0 {
            return Err(PipelineError::Config("pca.components must be at least 1".into()));
        }
        if self.tuning.enabled && self.tuning.max_evals == 0 {
            return Err(PipelineError::Config("tuning.max_evals must be at least 1".into()));
        }
        if self.same_size.enabled && self.partition == PartitionVariant::MaxTanimoto {
            for iso in &self.isoforms {
                if !self.same_size.sizes.contains_key(iso) {
                    return Err(PipelineError::Config(format!(
                        "same_size is enabled but no reference size is set for {iso}"
                    )));
                }
            }
        }
        let needs_schema = self.models.xgb_feature_sweep
            || matches!(
                self.feature_view,
                Some(FeatureView::LigandOnly) | Some(FeatureView::DockingOnly)
            );
        if needs_schema {
            for iso in &self.isoforms {
                if self.schema_for(iso).is_none() {
                    return Err(PipelineError::Config(format!(
                        "feature views need a column schema, none configured for {iso}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Thresholds in sweep order: ascending, duplicates removed.
    pub fn sweep_thresholds(&self) -> Vec<u32> {
        let mut t = self.thresholds.clone();
        t.sort_unstable();
        t.dedup();
        t
    }

    /// Column schema for an isoform, falling back to the default one.
    pub fn schema_for(&self, isoform: &str) -> Option<&FeatureSchema> {
        self.schema
            .isoforms
            .get(isoform)
            .or(self.schema.default.as_ref())
    }

    /// Reference training-set size for Max-Tanimoto size normalisation.
    pub fn reference_size(&self, isoform: &str) -> Option<usize> {
        if self.same_size.enabled {
            self.same_size.sizes.get(isoform).copied()
        } else {
            None
        }
    }

    /// Path of the append-only run log.
    pub fn run_log_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_Generated_EnsembleLearning_Models.txt",
            self.project_name
        ))
    }

    /// Path of the wide results table.
    pub fn results_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("result_all_{}.csv", self.project_name))
    }
}
