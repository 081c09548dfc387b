//! The isoform × threshold sweep.
//!
//! For every isoform the docked tables are loaded, resolved and normalised once.
//! Each threshold then runs
//! partition → feature view → balance → PCA → models
//! and yields one [`ResultColumn`]. After each isoform's thresholds the ledger
//! so far is written to disk, so a fatal error later in the sweep leaves every
//! completed isoform persisted.
//!
//! Iteration-local failures ([`PipelineError::is_iteration_local`]) become a
//! skipped column; a failing model becomes a `failed` block inside an
//! otherwise complete column.
use log::{info, warn};

use crate::balance::balance;
use crate::config::Config;
use crate::data_io::{read_docked_table, read_smiles_list, write_partition_csv, InputLayout};
use crate::error::{PipelineError, Result};
use crate::features::{select_pair, FeatureFrame, FeatureView};
use crate::identity::{resolve, ResolveReport};
use crate::models::{fit_and_score, ModelKind, ModelRegistry, SearchBudget};
use crate::partition::load_strategy;
use crate::records::{Activity, CanonicalTable, CompoundRecord, RecordSet};
use crate::reduction::project_pair;
use crate::results::{MetricBlock, ResultColumn, ResultLedger, RunLog};
use crate::scoring::{normalize, rank_score_means, Normalized};

/// Views XGB is re-run on when the feature sweep is enabled.
const FEATURE_SWEEP: [(&str, FeatureView); 3] = [
    ("All_features", FeatureView::All),
    ("Ligand_features", FeatureView::LigandOnly),
    ("Docked_features", FeatureView::DockingOnly),
];

/// Resolved, normalised data of one isoform, shared by all its thresholds.
#[derive(Debug, Clone)]
pub struct IsoformData {
    /// Isoform code, e.g. `2C9`.
    pub isoform: String,
    /// Resolved replicate rows with usable columns.
    pub records: RecordSet,
    /// Representatives and baseline AUC.
    pub normalized: Normalized,
    /// `Cleaning Sizes` block reported in every column.
    pub cleaning: MetricBlock,
}

fn entry(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn cleaning_block(active: &ResolveReport, inactive: &ResolveReport) -> MetricBlock {
    MetricBlock::new(
        "Cleaning Sizes",
        vec![
            entry("A shape", active.before),
            entry("I shape", inactive.before),
            entry("A Final", active.after),
            entry("I Final", inactive.after),
            entry("A malformed", active.malformed),
            entry("I malformed", inactive.malformed),
            entry("A unmatched", active.unmatched),
            entry("I unmatched", inactive.unmatched),
        ],
    )
}

fn auc_text(auc: Option<f64>) -> String {
    auc.map_or_else(|| "nan".to_string(), |a| a.to_string())
}

/// Reject partitions no model can be fitted or scored on.
fn check_degenerate(data_set: &str, train: &[&CompoundRecord], test: &[&CompoundRecord]) -> Result<()> {
    let degenerate = |message: &str| PipelineError::DegeneratePartition {
        data_set: data_set.to_string(),
        message: message.to_string(),
    };
    if train.is_empty() {
        return Err(degenerate("empty training set"));
    }
    if test.is_empty() {
        return Err(degenerate("empty test set"));
    }
    let actives = train.iter().filter(|r| r.activity.is_active()).count();
    if actives == 0 || actives == train.len() {
        return Err(degenerate("training set holds a single class"));
    }
    Ok(())
}

/// Runs the sweep described by one [`Config`].
pub struct Pipeline {
    config: Config,
    layout: InputLayout,
    registry: ModelRegistry,
}

impl Pipeline {
    /// Pipeline with the built-in RF/KNN/LR/GB trainers.
    pub fn new(config: Config) -> Self {
        let registry = ModelRegistry::with_builtin(config.seed);
        Self::with_registry(config, registry)
    }

    /// Pipeline with a caller-supplied set of trainers.
    pub fn with_registry(config: Config, registry: ModelRegistry) -> Self {
        Self {
            layout: InputLayout::new(&config.data_dir),
            config,
            registry,
        }
    }

    /// Configuration the sweep runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register extra trainers, e.g. for DNN or XGB.
    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    /// Load, resolve and normalise both docked tables of an isoform.
    pub fn load_isoform(&self, isoform: &str) -> Result<IsoformData> {
        let cfg = &self.config;
        let limit = cfg.subsample.enabled.then_some(cfg.subsample.size);

        let mut canonical = read_smiles_list(self.layout.smiles_list(isoform, Activity::Active), Activity::Active)?;
        canonical.extend(read_smiles_list(
            self.layout.smiles_list(isoform, Activity::Inactive),
            Activity::Inactive,
        )?);
        let canonical = CanonicalTable::new(canonical);

        let load = |activity: Activity| {
            read_docked_table(
                self.layout.docked_scores(isoform, activity),
                activity,
                &cfg.name_column,
                limit,
            )
        };
        let (active_table, inactive_table) = (load(Activity::Active)?, load(Activity::Inactive)?);
        if active_table.columns != inactive_table.columns {
            return Err(PipelineError::SchemaMismatch(format!(
                "{isoform}: active and inactive tables have different columns"
            )));
        }
        let columns = active_table.columns.clone();

        let (mut records, active_report) = resolve(active_table, &canonical);
        let (inactives, inactive_report) = resolve(inactive_table, &canonical);
        records.extend(inactives);

        let mut set = RecordSet { columns, records };
        let dropped = set.drop_columns(&cfg.drop_columns);
        if !dropped.is_empty() {
            info!("{isoform}: dropped non-feature columns {dropped:?}");
        }
        let incomplete = set.drop_incomplete_columns();
        if !incomplete.is_empty() {
            warn!("{isoform}: dropped {} columns with missing values: {incomplete:?}", incomplete.len());
        }

        rank_score_means(&set.records);
        let normalized = normalize(&set.records);
        info!(
            "{isoform}: {} compounds, FITTED AUC {}",
            normalized.representatives.len(),
            auc_text(normalized.baseline_auc)
        );

        Ok(IsoformData {
            isoform: isoform.to_string(),
            records: set,
            normalized,
            cleaning: cleaning_block(&active_report, &inactive_report),
        })
    }

    fn budget(&self) -> Option<SearchBudget> {
        self.config.tuning.enabled.then_some(SearchBudget {
            max_evals: self.config.tuning.max_evals,
            seed: self.config.seed,
        })
    }

    /// Fit and score one registered trainer; failures become sentinel blocks.
    fn score_block(&self, label: &str, kind: ModelKind, train: &FeatureFrame, test: &FeatureFrame) -> MetricBlock {
        let Some(trainer) = self.registry.get(kind) else {
            warn!("{label}: enabled but no trainer is registered");
            return MetricBlock::unavailable(label);
        };
        match fit_and_score(trainer, train, test, self.budget()) {
            Ok(score) => {
                info!("{label}: AUC {} ({})", auc_text(score.report.auc), score.params);
                let mut entries = score.report.entries();
                entries.push(entry("params", score.params));
                MetricBlock::new(label, entries)
            }
            Err(e) => {
                warn!("{label} failed: {e}");
                MetricBlock::failed(label, e)
            }
        }
    }

    /// Apply a view to both frames, then balance the training side.
    fn prepare(
        &self,
        isoform: &str,
        train: &FeatureFrame,
        test: &FeatureFrame,
        view: Option<FeatureView>,
    ) -> Result<(FeatureFrame, FeatureFrame, MetricBlock)> {
        let (train, test) = match view {
            Some(v) => select_pair(train, test, self.config.schema_for(isoform), v)?,
            None => (train.clone(), test.clone()),
        };
        let (train, report) = balance(train, self.config.seed)?;
        Ok((train, test, MetricBlock::new("Balance", report.entries())))
    }

    /// Run one threshold of an already loaded isoform.
    pub fn run_iteration(&self, data: &IsoformData, threshold: u32) -> Result<ResultColumn> {
        let cfg = &self.config;
        let iso = data.isoform.as_str();
        let name = format!("{iso}-{threshold}");
        info!("---- {name} ----");

        let mut column = ResultColumn::new(&name);
        column.push(data.cleaning.clone());
        column.push(MetricBlock::new(
            "auc",
            vec![entry("auc", auc_text(data.normalized.baseline_auc))],
        ));

        let strategy = load_strategy(cfg, &self.layout, iso, threshold)?;
        let partition = strategy.partition(&data.records.records, &data.normalized)?;
        partition.ensure_disjoint()?;
        let (train_rows, test_rows) = partition.expand(&data.records.records);
        check_degenerate(&name, &train_rows, &test_rows)?;

        let snapshot = cfg
            .output_dir
            .join("test_sets")
            .join(strategy.snapshot_file(iso, threshold));
        write_partition_csv(&snapshot, &cfg.name_column, &data.records.columns, &test_rows)?;

        info!("{name}: train {} rows, test {} rows", train_rows.len(), test_rows.len());
        column.push(MetricBlock::new(
            "Data Sizes",
            vec![
                entry("train size", train_rows.len()),
                entry("test size", test_rows.len()),
            ],
        ));

        let train = FeatureFrame::from_records(&data.records.columns, &train_rows)?;
        let test = FeatureFrame::from_records(&data.records.columns, &test_rows)?;

        let (mut x_train, mut x_test, balance_block) = self.prepare(iso, &train, &test, cfg.feature_view)?;
        column.push(balance_block);
        if cfg.pca.enabled {
            (x_train, x_test) = project_pair(&x_train, &x_test, cfg.pca.components)?;
        }

        if cfg.models.xgb_feature_sweep {
            for (label, view) in FEATURE_SWEEP {
                let block = match self.prepare(iso, &train, &test, Some(view)) {
                    Ok((tr, te, _)) => self.score_block(label, ModelKind::XGBoost, &tr, &te),
                    Err(e) => {
                        warn!("{label} skipped: {e}");
                        MetricBlock::failed(label, e)
                    }
                };
                column.push(block);
            }
            column.push(MetricBlock::new(
                "FITTED",
                vec![entry("auc", auc_text(data.normalized.baseline_auc))],
            ));
        }

        for kind in ModelKind::ALL {
            if kind.enabled(&cfg.models) {
                column.push(self.score_block(kind.label(), kind, &x_train, &x_test));
            }
        }
        Ok(column)
    }

    /// Sweep every configured isoform and threshold.
    ///
    /// Returns the full ledger; the same table is on disk at
    /// [`Config::results_path`].
    pub fn run(&self) -> Result<ResultLedger> {
        let cfg = &self.config;
        let log = RunLog::start(cfg.run_log_path(), &cfg.project_name)?;
        let thresholds = cfg.sweep_thresholds();
        let mut ledger = ResultLedger::new();

        for iso in &cfg.isoforms {
            info!("==== isoform {iso} ====");
            let data = match self.load_isoform(iso) {
                Ok(data) => Some(data),
                Err(e) if e.is_iteration_local() => {
                    warn!("{iso}: skipping every threshold: {e}");
                    log.append(&format!("{iso}: skipped ({e})"))?;
                    for &t in &thresholds {
                        ledger.push(ResultColumn::skipped(format!("{iso}-{t}"), &e));
                    }
                    None
                }
                Err(e) => return Err(e),
            };

            if let Some(data) = data {
                for &t in &thresholds {
                    let column = match self.run_iteration(&data, t) {
                        Ok(column) => column,
                        Err(e) if e.is_iteration_local() => {
                            warn!("{iso}-{t}: skipped: {e}");
                            ResultColumn::skipped(format!("{iso}-{t}"), &e)
                        }
                        Err(e) => return Err(e),
                    };
                    log.column(&column)?;
                    ledger.push(column);
                }
            }
            ledger.persist(cfg.results_path())?;
        }

        log.finish(&ledger)?;
        info!("sweep finished: {} columns", ledger.len());
        Ok(ledger)
    }
}
