//! Classifier collaborators and the glue that feeds them.
//!
//! This module contains:
//! - `to_ndarrays`: convert `Vec<Vec<f64>>` rows and class labels into
//!   `ndarray::Array2<f64>` / `ndarray::Array1<usize>`.
//! - [`Trainer`] / [`FittedModel`]: the input/output contract every model
//!   collaborator implements: fit on `(X_train, y_train)`, return positive-class
//!   probabilities for `X_test`.
//! - [`ModelRegistry`]: which trainer runs for each [`ModelKind`]. Built-in
//!   trainers cover RF, KNN, LR and GB; DNN and XGB are supplied by the caller.
//! - [`fit_and_score`]: optional hyperparameter search, fit, and test-set
//!   metrics for one trainer.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;

use crate::config::ModelToggles;
use crate::error::ModelError;
use crate::features::FeatureFrame;
use crate::metrics::{evaluate, ClassificationReport};

pub mod boost;
pub mod forest;
pub mod knn;
pub mod logistic;
pub mod tuning;

pub use boost::GradientBoostTrainer;
pub use forest::RandomForestTrainer;
pub use knn::KnnTrainer;
pub use logistic::LogisticTrainer;

/// Convert feature rows and class labels into ndarray arrays suitable for Linfa.
///
/// - `descriptors` is a Vec of samples, each sample is a Vec of features (n_samples x n_features).
/// - `labels` holds one class index per sample.
///
/// An empty input yields a `0 x 0` matrix.
pub fn to_ndarrays(
    descriptors: Vec<Vec<f64>>,
    labels: Vec<usize>,
) -> Result<(Array2<f64>, Array1<usize>), ModelError> {
    let n_samples = descriptors.len();
    if labels.len() != n_samples {
        return Err(ModelError::Shape(
            "labels length does not match number of descriptor rows".into(),
        ));
    }
    let n_features = descriptors.first().map_or(0, Vec::len);

    // Ensure all rows have the same length and flatten into a single Vec
    let mut flat: Vec<f64> = Vec::with_capacity(n_samples * n_features);
    for row in &descriptors {
        if row.len() != n_features {
            return Err(ModelError::Shape("inconsistent feature lengths in descriptors".into()));
        }
        flat.extend_from_slice(&row[..]);
    }

    // Build Array2 in row-major order: shape = (n_samples, n_features)
    let x = Array2::from_shape_vec((n_samples, n_features), flat)
        .map_err(|e| ModelError::Shape(format!("failed to construct Array2: {e}")))?;

    Ok((x, Array1::from_vec(labels)))
}

/// The classifiers the sweep knows about, in result-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Random forest (`RF`).
    RandomForest,
    /// k-nearest neighbours (`KNN`).
    Knn,
    /// Logistic regression (`LR`).
    LogisticRegression,
    /// Neural network (`DNN`).
    Dnn,
    /// Gradient boosting (`GB`).
    GradientBoost,
    /// XGBoost (`XGB`).
    XGBoost,
}

impl ModelKind {
    /// Every kind, in result-table order.
    pub const ALL: [ModelKind; 6] = [
        ModelKind::RandomForest,
        ModelKind::Knn,
        ModelKind::LogisticRegression,
        ModelKind::Dnn,
        ModelKind::GradientBoost,
        ModelKind::XGBoost,
    ];

    /// Block name in the results table.
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "RF",
            ModelKind::Knn => "KNN",
            ModelKind::LogisticRegression => "LR",
            ModelKind::Dnn => "DNN",
            ModelKind::GradientBoost => "GB",
            ModelKind::XGBoost => "XGB",
        }
    }

    /// Whether the configuration switches this model on.
    pub fn enabled(self, toggles: &ModelToggles) -> bool {
        match self {
            ModelKind::RandomForest => toggles.rf,
            ModelKind::Knn => toggles.knn,
            ModelKind::LogisticRegression => toggles.lr,
            ModelKind::Dnn => toggles.dnn,
            ModelKind::GradientBoost => toggles.gb,
            ModelKind::XGBoost => toggles.xgb,
        }
    }
}

/// A fitted classifier.
pub trait FittedModel {
    /// Probability of the positive (active) class for every row of `x`.
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64>;
}

/// An unfitted, configured classifier.
pub trait Trainer {
    /// Human-readable hyperparameters, recorded in the results.
    fn describe(&self) -> String;

    /// Fit on `x` (one row per replicate) and class labels `y` (1 = active).
    fn fit(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError>;

    /// Boxed copy of this trainer.
    fn boxed_clone(&self) -> Box<dyn Trainer>;

    /// A random variant for hyperparameter search; `None` when the trainer has
    /// no search space.
    fn sample(&self, _rng: &mut StdRng) -> Option<Box<dyn Trainer>> {
        None
    }
}

/// Trainer per model kind.
pub struct ModelRegistry {
    trainers: Vec<(ModelKind, Box<dyn Trainer>)>,
}

impl ModelRegistry {
    /// Registry with no trainers.
    pub fn empty() -> Self {
        Self { trainers: Vec::new() }
    }

    /// RF, KNN, LR and GB with default hyperparameters.
    pub fn with_builtin(seed: u64) -> Self {
        let mut reg = Self::empty();
        reg.register(ModelKind::RandomForest, Box::new(RandomForestTrainer::new(seed)));
        reg.register(ModelKind::Knn, Box::new(KnnTrainer::default()));
        reg.register(ModelKind::LogisticRegression, Box::new(LogisticTrainer::default()));
        reg.register(ModelKind::GradientBoost, Box::new(GradientBoostTrainer::default()));
        reg
    }

    /// Add or replace the trainer for `kind`.
    pub fn register(&mut self, kind: ModelKind, trainer: Box<dyn Trainer>) {
        self.trainers.retain(|(k, _)| *k != kind);
        self.trainers.push((kind, trainer));
    }

    /// Trainer registered for `kind`, if any.
    pub fn get(&self, kind: ModelKind) -> Option<&dyn Trainer> {
        self.trainers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, t)| t.as_ref())
    }
}

/// Hyperparameter search settings for one fit.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    /// Candidates sampled besides the base trainer.
    pub max_evals: usize,
    /// Seed for the hold-out split and sampling.
    pub seed: u64,
}

/// Test-set metrics plus the hyperparameters that produced them.
#[derive(Debug, Clone)]
pub struct ModelScore {
    /// Metrics on the test set.
    pub report: ClassificationReport,
    /// `Trainer::describe` of the chosen candidate.
    pub params: String,
}

/// Optionally tune, then fit on `train` and score on `test`.
pub fn fit_and_score(
    trainer: &dyn Trainer,
    train: &FeatureFrame,
    test: &FeatureFrame,
    budget: Option<SearchBudget>,
) -> Result<ModelScore, ModelError> {
    if train.x.ncols() != test.x.ncols() {
        return Err(ModelError::Shape(format!(
            "train has {} features, test has {}",
            train.x.ncols(),
            test.x.ncols()
        )));
    }
    let chosen = match budget {
        Some(b) => tuning::random_search(trainer, &train.x, &train.y, b)?,
        None => trainer.boxed_clone(),
    };
    let fitted = chosen.fit(&train.x, &train.y)?;
    let proba = fitted.predict_proba(&test.x);
    let labels: Vec<usize> = test.y.to_vec();
    Ok(ModelScore {
        report: evaluate(&labels, &proba.to_vec()),
        params: chosen.describe(),
    })
}

/// Column-wise z-scoring fitted on training data.
#[derive(Debug, Clone)]
pub(crate) struct Standardizer {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl Standardizer {
    pub(crate) fn fit(x: &Array2<f64>) -> Self {
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        Self { mean, scale }
    }

    pub(crate) fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}
