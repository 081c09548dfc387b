//! Seeded random hyperparameter search.
//!
//! Candidates are the base trainer plus `max_evals` random variants from
//! [`Trainer::sample`]. Each one is fitted on 80% of the training rows and
//! scored by AUC on the remaining 20%. The hold-out is drawn with a fixed seed,
//! so repeated runs pick the same winner. Variants that fail to fit are
//! skipped.
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{SearchBudget, Trainer};
use crate::error::ModelError;
use crate::metrics::roc_auc;

const HOLDOUT_FRACTION: f64 = 0.2;

fn has_both_classes(y: &Array1<usize>) -> bool {
    y.iter().any(|&c| c == 1) && y.iter().any(|&c| c != 1)
}

/// Return the best-scoring candidate, unfitted.
pub fn random_search(
    base: &dyn Trainer,
    x: &Array2<f64>,
    y: &Array1<usize>,
    budget: SearchBudget,
) -> Result<Box<dyn Trainer>, ModelError> {
    let mut rng = StdRng::seed_from_u64(budget.seed);
    let n = x.nrows();
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut rng);
    let n_hold = ((n as f64) * HOLDOUT_FRACTION).round() as usize;
    let (hold, fit) = idx.split_at(n_hold.min(n));

    let (x_fit, y_fit) = (x.select(Axis(0), fit), y.select(Axis(0), fit));
    let (x_hold, y_hold) = (x.select(Axis(0), hold), y.select(Axis(0), hold));
    if !has_both_classes(&y_fit) || !has_both_classes(&y_hold) {
        warn!("hold-out split lacks a class, skipping hyperparameter search");
        return Ok(base.boxed_clone());
    }
    let truth: Vec<bool> = y_hold.iter().map(|&c| c == 1).collect();

    let mut candidates = vec![base.boxed_clone()];
    for _ in 0..budget.max_evals {
        match base.sample(&mut rng) {
            Some(c) => candidates.push(c),
            None => break,
        }
    }

    let mut best: Option<(f64, Box<dyn Trainer>)> = None;
    for cand in candidates {
        let auc = match cand.fit(&x_fit, &y_fit) {
            Ok(model) => roc_auc(&truth, &model.predict_proba(&x_hold).to_vec()).unwrap_or(0.5),
            Err(e) => {
                debug!("candidate {} failed: {e}", cand.describe());
                continue;
            }
        };
        debug!("candidate {} -> hold-out AUC {auc:.4}", cand.describe());
        if best.as_ref().map_or(true, |(b, _)| auc > *b) {
            best = Some((auc, cand));
        }
    }

    best.map(|(_, c)| c).ok_or_else(|| ModelError::Fit {
        model: base.describe(),
        message: "every hyperparameter candidate failed".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FittedModel, KnnTrainer};
    use ndarray::Array1;

    #[derive(Clone)]
    struct Constant(f64);

    impl FittedModel for Constant {
        fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
            Array1::from_elem(x.nrows(), self.0)
        }
    }

    impl Trainer for Constant {
        fn describe(&self) -> String {
            "constant".into()
        }
        fn fit(&self, _x: &Array2<f64>, _y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
            Ok(Box::new(self.clone()))
        }
        fn boxed_clone(&self) -> Box<dyn Trainer> {
            Box::new(self.clone())
        }
    }

    fn data() -> (Array2<f64>, Array1<usize>) {
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i as f64) * if j == 0 { 1.0 } else { -0.5 });
        let y = Array1::from_shape_fn(n, |i| usize::from(i >= n / 2));
        (x, y)
    }

    #[test]
    fn trainer_without_search_space_is_returned_as_is() {
        let (x, y) = data();
        let picked = random_search(&Constant(0.3), &x, &y, SearchBudget { max_evals: 5, seed: 1 }).unwrap();
        assert_eq!(picked.describe(), "constant");
    }

    #[test]
    fn search_is_reproducible() {
        let (x, y) = data();
        let budget = SearchBudget { max_evals: 6, seed: 11 };
        let a = random_search(&KnnTrainer::default(), &x, &y, budget).unwrap();
        let b = random_search(&KnnTrainer::default(), &x, &y, budget).unwrap();
        assert_eq!(a.describe(), b.describe());
    }
}
