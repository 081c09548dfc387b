//! L2-regularised logistic regression via `linfa-logistic`, on z-scored features.
use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;

use super::{FittedModel, Standardizer, Trainer};
use crate::error::ModelError;

/// Logistic regression hyperparameters.
#[derive(Debug, Clone)]
pub struct LogisticTrainer {
    /// L2 penalty strength.
    pub alpha: f64,
    /// Optimiser iteration cap.
    pub max_iterations: u64,
}

impl Default for LogisticTrainer {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            max_iterations: 200,
        }
    }
}

struct FittedLogistic {
    scaler: Standardizer,
    model: FittedLogisticRegression<f64, usize>,
}

impl FittedModel for FittedLogistic {
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let z = self.scaler.transform(x);
        let p = self.model.predict_probabilities(&z);
        // probabilities refer to whichever class linfa picked as positive
        if self.model.labels().pos.class == 1 {
            p
        } else {
            p.mapv(|v| 1.0 - v)
        }
    }
}

impl Trainer for LogisticTrainer {
    fn describe(&self) -> String {
        format!("alpha={:.5} max_iterations={}", self.alpha, self.max_iterations)
    }

    fn fit(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
        let scaler = Standardizer::fit(x);
        let dataset = Dataset::new(scaler.transform(x), y.clone());
        let model = LogisticRegression::default()
            .alpha(self.alpha)
            .max_iterations(self.max_iterations)
            .fit(&dataset)
            .map_err(|e| ModelError::Fit {
                model: "LR".into(),
                message: e.to_string(),
            })?;
        Ok(Box::new(FittedLogistic { scaler, model }))
    }

    fn boxed_clone(&self) -> Box<dyn Trainer> {
        Box::new(self.clone())
    }

    fn sample(&self, rng: &mut StdRng) -> Option<Box<dyn Trainer>> {
        Some(Box::new(Self {
            alpha: 10f64.powf(rng.gen_range(-4.0..1.0)),
            max_iterations: [100, 200, 500][rng.gen_range(0..3)],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn probabilities_point_at_the_active_class() {
        let x = array![
            [-2.0, 0.3],
            [-1.5, -0.2],
            [-1.0, 0.1],
            [-0.5, 0.0],
            [0.5, 0.2],
            [1.0, -0.1],
            [1.5, 0.0],
            [2.0, 0.1]
        ];
        let y = Array1::from_vec(vec![0, 0, 0, 0, 1, 1, 1, 1]);
        let model = LogisticTrainer::default().fit(&x, &y).unwrap();
        let p = model.predict_proba(&array![[-3.0, 0.0], [3.0, 0.0]]);
        assert!(p[0] < 0.5);
        assert!(p[1] > 0.5);
    }
}
