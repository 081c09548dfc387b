//! Random forest: bagged `linfa-trees` decision trees over random feature subspaces.
//!
//! Each tree sees a bootstrap sample of the rows and a random subset of the
//! columns. The positive-class probability is the fraction of trees voting
//! active.
use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FittedModel, Trainer};
use crate::error::ModelError;

/// Random forest hyperparameters.
#[derive(Debug, Clone)]
pub struct RandomForestTrainer {
    /// Number of bagged trees.
    pub n_trees: usize,
    /// Depth cap per tree; `None` grows until pure.
    pub max_depth: Option<usize>,
    /// Fraction of columns offered to each tree.
    pub feature_fraction: f64,
    /// Minimum sample weight in a leaf.
    pub min_weight_leaf: f32,
    /// Seed for bootstrap and column sampling.
    pub seed: u64,
}

impl RandomForestTrainer {
    /// 100 trees of depth 12, each over half of the columns.
    pub fn new(seed: u64) -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(12),
            feature_fraction: 0.5,
            min_weight_leaf: 1.0,
            seed,
        }
    }
}

struct Member {
    tree: DecisionTree<f64, usize>,
    columns: Vec<usize>,
}

struct FittedForest {
    members: Vec<Member>,
}

impl FittedModel for FittedForest {
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut votes = Array1::<f64>::zeros(x.nrows());
        for m in &self.members {
            let sub = x.select(Axis(1), &m.columns);
            let pred: Array1<usize> = m.tree.predict(&sub);
            votes.zip_mut_with(&pred, |v, &p| *v += p as f64);
        }
        votes / self.members.len().max(1) as f64
    }
}

impl Trainer for RandomForestTrainer {
    fn describe(&self) -> String {
        format!(
            "n_trees={} max_depth={:?} feature_fraction={:.2} min_weight_leaf={}",
            self.n_trees, self.max_depth, self.feature_fraction, self.min_weight_leaf
        )
    }

    fn fit(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
        let (n, p) = x.dim();
        if n == 0 || p == 0 {
            return Err(ModelError::Shape(format!("cannot fit a forest on a {n} x {p} matrix")));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let k = ((p as f64 * self.feature_fraction).ceil() as usize).clamp(1, p);

        let mut members = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut columns = rand::seq::index::sample(&mut rng, p, k).into_vec();
            columns.sort_unstable();

            let xb = x.select(Axis(0), &rows).select(Axis(1), &columns);
            let yb = y.select(Axis(0), &rows);
            let dataset = Dataset::new(xb, yb);
            let tree = DecisionTree::params()
                .max_depth(self.max_depth)
                .min_weight_leaf(self.min_weight_leaf)
                .fit(&dataset)
                .map_err(|e| ModelError::Fit {
                    model: "RF".into(),
                    message: e.to_string(),
                })?;
            members.push(Member { tree, columns });
        }
        Ok(Box::new(FittedForest { members }))
    }

    fn boxed_clone(&self) -> Box<dyn Trainer> {
        Box::new(self.clone())
    }

    fn sample(&self, rng: &mut StdRng) -> Option<Box<dyn Trainer>> {
        const TREES: [usize; 4] = [50, 100, 200, 300];
        const DEPTHS: [Option<usize>; 4] = [None, Some(6), Some(12), Some(20)];
        Some(Box::new(Self {
            n_trees: TREES[rng.gen_range(0..TREES.len())],
            max_depth: DEPTHS[rng.gen_range(0..DEPTHS.len())],
            feature_fraction: rng.gen_range(0.2..=1.0),
            min_weight_leaf: [1.0, 2.0, 4.0][rng.gen_range(0..3)],
            seed: self.seed,
        }))
    }
}
