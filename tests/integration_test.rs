use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::Path;

use cyp_dock_ml::models::FittedModel;
use cyp_dock_ml::{Config, ModelError, ModelKind, ModelRegistry, Pipeline, Trainer};
use ndarray::{Array1, Array2};
use tempfile::TempDir;

const ISO: &str = "2C9";

fn active_ids() -> Vec<u64> {
    (1001..=1010).collect()
}

fn inactive_ids() -> Vec<u64> {
    (2001..=2010).collect()
}

/// Docked table with five replicates per compound.
fn docked_csv(ids: &[u64], base: f64) -> String {
    let mut out = String::from("Molecule Name,RankScore,MatchScore,HBonds,Energy\n");
    for &id in ids {
        for r in 1..=5 {
            let rank = base + 0.1 * r as f64 - 0.05 * (id % 10) as f64;
            out.push_str(&format!("{id}_{r},{rank},{},{},{}\n", 30 + r, id % 7, rank * 2.0));
        }
    }
    out
}

fn smiles(ids: &[u64]) -> String {
    ids.iter().map(|id| format!("{id} CCO\n")).collect()
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Docked scores and SMILES lists for one isoform.
fn write_isoform(root: &Path) {
    let docked = root.join("Results_CSV").join(ISO);
    write(
        &docked.join(format!("{ISO}-docked-actives-scored.csv")),
        &docked_csv(&active_ids(), -12.0),
    );
    write(
        &docked.join(format!("{ISO}-docked-inactives-scored.csv")),
        &docked_csv(&inactive_ids(), -7.0),
    );
    write(&root.join("Smiles").join(format!("{ISO}-active.smi")), &smiles(&active_ids()));
    write(&root.join("Smiles").join(format!("{ISO}-inactive.smi")), &smiles(&inactive_ids()));
}

fn config(root: &Path, partition: &str, thresholds: &str, extra: &str) -> Config {
    let toml = format!(
        r#"
project_name = "synthetic"
data_dir = "{data}"
output_dir = "{out}"
isoforms = ["{ISO}"]
thresholds = {thresholds}
partition = "{partition}"

[models]
rf = false
knn = true
lr = false
gb = false
{extra}
"#,
        data = root.display(),
        out = root.join("out").display(),
    );
    Config::from_toml_str(&toml).unwrap()
}

/// Scores every row by its first feature column, squashed into (0, 1).
#[derive(Clone)]
struct NegatedRank;

impl FittedModel for NegatedRank {
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        x.column(0).mapv(|v| 1.0 / (1.0 + v.exp()))
    }
}

impl Trainer for NegatedRank {
    fn describe(&self) -> String {
        "negated-rank".into()
    }
    fn fit(&self, _x: &Array2<f64>, _y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
        Ok(Box::new(NegatedRank))
    }
    fn boxed_clone(&self) -> Box<dyn Trainer> {
        Box::new(self.clone())
    }
}

fn snapshot_ids(path: &Path) -> Result<Vec<u64>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut ids = Vec::new();
    for rec in rdr.records() {
        ids.push(rec?[0].parse()?);
    }
    Ok(ids)
}

#[test]
fn max_tanimoto_sweep_reports_sizes_before_balancing() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write_isoform(root);
    let tc = root.join("Clusters_Max_TC");
    write(
        &tc.join(format!("train_set_{ISO}_0.3.csv")),
        "id,max_tc\n1001,0.2\n1002,0.2\n1003,0.1\n1004,0.3\n2001,0.2\n2002,0.1\n2003,0.2\n",
    );
    // 2005 is listed twice; the duplicate must not double its rows
    write(
        &tc.join(format!("test_set_{ISO}.csv")),
        "id\n1005\n2004\n2005\n2005\n",
    );

    let cfg = config(root, "max_tanimoto", "[30]", "xgb = true");
    let mut registry = ModelRegistry::with_builtin(cfg.seed);
    registry.register(ModelKind::XGBoost, Box::new(NegatedRank));
    let pipeline = Pipeline::with_registry(cfg.clone(), registry);
    let ledger = pipeline.run()?;

    assert_eq!(ledger.len(), 1);
    let column = &ledger.columns()[0];
    assert_eq!(column.name, "2C9-30");
    assert_eq!(column.value("Data Sizes", "train size"), Some("35"));
    assert_eq!(column.value("Data Sizes", "test size"), Some("15"));
    assert_eq!(column.value("Cleaning Sizes", "A Final"), Some("50"));
    // 20 actives vs 15 inactives in train: no oversampling
    assert_eq!(column.value("Balance", "active after"), Some("20"));
    assert_eq!(column.value("Balance", "inactive after"), Some("15"));

    let baseline: f64 = column.value("auc", "auc").unwrap().parse()?;
    assert!((baseline - 1.0).abs() < 1e-12);
    assert_eq!(column.value("XGB", "params"), Some("negated-rank"));
    assert_eq!(column.value("XGB", "auc"), Some("1"));
    assert!(column.block("KNN").is_some());
    assert!(column.block("DNN").is_none());

    let names: Vec<&str> = column.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Cleaning Sizes", "auc", "Data Sizes", "Balance", "KNN", "XGB"]
    );

    let test_ids = snapshot_ids(&root.join("out").join("test_sets").join("max_tc_2C9_30.csv"))?;
    assert_eq!(test_ids.len(), 15);
    let train_ids: HashSet<u64> = [1001, 1002, 1003, 1004, 2001, 2002, 2003].into_iter().collect();
    assert!(test_ids.iter().all(|id| !train_ids.contains(id)));

    assert!(cfg.results_path().exists());
    let log = fs::read_to_string(cfg.run_log_path())?;
    assert!(log.contains("[2C9-30]"));
    Ok(())
}

#[test]
fn analog_sweep_skips_thresholds_with_missing_lists() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write_isoform(root);

    // every active listed three times, every inactive five times
    let listing = |ids: Vec<u64>, times: usize| -> String {
        ids.iter()
            .flat_map(|id| std::iter::repeat(format!("{id}\n")).take(times))
            .collect()
    };
    let clusters = root.join("Analog_Clusters");
    write(
        &clusters.join("cluster_list_2c9-actives_40.txt"),
        &listing(active_ids(), 3),
    );
    write(
        &clusters.join("cluster_list_2c9-inactives_40.txt"),
        &listing(inactive_ids(), 5),
    );

    let cfg = config(root, "analog_cluster", "[50, 40]", "");
    let ledger = Pipeline::new(cfg.clone()).run()?;

    let names: Vec<&str> = ledger.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["2C9-40", "2C9-50"]);

    let done = &ledger.columns()[0];
    // 8 of 10 compounds per class go to train; 3 active and 5 inactive rows each
    assert_eq!(done.value("Data Sizes", "train size"), Some("64"));
    assert_eq!(done.value("Data Sizes", "test size"), Some("16"));
    assert_eq!(done.value("Balance", "active before"), Some("24"));
    assert_eq!(done.value("Balance", "active after"), Some("40"));
    assert_eq!(done.value("Balance", "inactive after"), Some("40"));

    let skipped = &ledger.columns()[1];
    assert_eq!(skipped.value("Status", "status"), Some("skipped"));
    assert!(skipped.value("Status", "reason").unwrap().contains("missing input"));

    let table = fs::read_to_string(cfg.results_path())?;
    assert!(table.starts_with("block,metric,2C9-40,2C9-50"));
    Ok(())
}

#[test]
fn missing_isoform_data_skips_every_threshold() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let cfg = config(dir.path(), "max_tanimoto", "[30, 40]", "");
    let ledger = Pipeline::new(cfg).run()?;

    assert_eq!(ledger.len(), 2);
    for column in ledger.columns() {
        assert_eq!(column.value("Status", "status"), Some("skipped"));
    }
    Ok(())
}

#[test]
fn enabled_model_without_trainer_is_marked_unavailable() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write_isoform(root);
    let tc = root.join("Clusters_Max_TC");
    write(
        &tc.join(format!("train_set_{ISO}_0.5.csv")),
        "id\n1001\n1002\n1003\n2001\n2002\n2003\n2004\n",
    );
    write(&tc.join(format!("test_set_{ISO}.csv")), "id\n1009\n1010\n2009\n2010\n");

    let cfg = config(root, "max_tanimoto", "[50]", "dnn = true");
    let ledger = Pipeline::new(cfg).run()?;
    let column = &ledger.columns()[0];
    assert_eq!(column.value("DNN", "status"), Some("unavailable"));
    // 15 active vs 20 inactive rows: oversampled to 20 each
    assert_eq!(column.value("Balance", "active before"), Some("15"));
    assert_eq!(column.value("Balance", "active after"), Some("20"));
    Ok(())
}

#[test]
fn ragged_train_table_skips_only_its_threshold() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write_isoform(root);
    let tc = root.join("Clusters_Max_TC");
    write(&tc.join(format!("train_set_{ISO}_0.3.csv")), "id,max_tc\n1001,0.2\n1002\n");
    write(
        &tc.join(format!("train_set_{ISO}_0.4.csv")),
        "id,max_tc\n1001,0.2\n1002,0.2\n1003,0.1\n1004,0.3\n2001,0.2\n2002,0.1\n2003,0.2\n",
    );
    write(&tc.join(format!("test_set_{ISO}.csv")), "id\n1005\n2004\n2005\n");

    let cfg = config(root, "max_tanimoto", "[30, 40]", "");
    let ledger = Pipeline::new(cfg).run()?;

    let names: Vec<&str> = ledger.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["2C9-30", "2C9-40"]);

    let skipped = &ledger.columns()[0];
    assert_eq!(skipped.value("Status", "status"), Some("skipped"));
    assert!(skipped.value("Status", "reason").unwrap().contains("malformed input"));

    let done = &ledger.columns()[1];
    assert!(done.block("Status").is_none());
    assert_eq!(done.value("Data Sizes", "train size"), Some("35"));
    assert!(done.block("KNN").is_some());
    Ok(())
}

/// Trainer whose fit always fails.
#[derive(Clone)]
struct Diverging;

impl Trainer for Diverging {
    fn describe(&self) -> String {
        "diverging".into()
    }
    fn fit(&self, _x: &Array2<f64>, _y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
        Err(ModelError::Fit {
            model: "XGB".into(),
            message: "loss diverged".into(),
        })
    }
    fn boxed_clone(&self) -> Box<dyn Trainer> {
        Box::new(self.clone())
    }
}

#[test]
fn failing_model_is_recorded_and_other_models_still_score() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write_isoform(root);
    let tc = root.join("Clusters_Max_TC");
    write(
        &tc.join(format!("train_set_{ISO}_0.3.csv")),
        "id\n1001\n1002\n1003\n1004\n2001\n2002\n2003\n",
    );
    write(&tc.join(format!("test_set_{ISO}.csv")), "id\n1005\n2004\n2005\n");

    let cfg = config(root, "max_tanimoto", "[30]", "xgb = true");
    let mut registry = ModelRegistry::with_builtin(cfg.seed);
    registry.register(ModelKind::XGBoost, Box::new(Diverging));
    let ledger = Pipeline::with_registry(cfg.clone(), registry).run()?;

    let column = &ledger.columns()[0];
    assert!(column.block("Status").is_none());
    assert_eq!(column.value("XGB", "status"), Some("failed"));
    assert!(column.value("XGB", "error").unwrap().contains("loss diverged"));
    assert!(column.value("KNN", "auc").is_some());

    let table = fs::read_to_string(cfg.results_path())?;
    assert!(table.contains("failed"));
    Ok(())
}
