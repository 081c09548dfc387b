//! Gradient boosting with regression stumps on the binary log-loss.
//!
//! Starts from the log-odds of the training prevalence; every round fits a
//! depth-one regression tree to the residuals `y - p` and adds its Newton-step
//! leaf values, scaled by the learning rate. Prediction is the sigmoid of the
//! accumulated log-odds.
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use super::{FittedModel, Trainer};
use crate::error::ModelError;

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone)]
pub struct GradientBoostTrainer {
    /// Boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to every stump.
    pub learning_rate: f64,
}

impl Default for GradientBoostTrainer {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Stump {
    feature: usize,
    threshold: f64,
    left: f64,
    right: f64,
}

impl Stump {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        if row[self.feature] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

struct FittedBoost {
    initial: f64,
    learning_rate: f64,
    stumps: Vec<Stump>,
}

impl FittedModel for FittedBoost {
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let f = self.stumps.iter().fold(self.initial, |acc, s| {
                    acc + self.learning_rate * s.predict(row)
                });
                sigmoid(f)
            })
            .collect()
    }
}

fn newton_step(residual: f64, hessian: f64) -> f64 {
    if hessian > 1e-12 {
        residual / hessian
    } else {
        0.0
    }
}

/// Best split over all features given per-feature sorted row orders.
fn fit_stump(x: &Array2<f64>, sorted: &[Vec<usize>], resid: &[f64], hess: &[f64]) -> Option<Stump> {
    let total_r: f64 = resid.iter().sum();
    let total_h: f64 = hess.iter().sum();
    let n = resid.len() as f64;

    let mut best: Option<(f64, Stump)> = None;
    for (j, order) in sorted.iter().enumerate() {
        let (mut r_left, mut h_left, mut n_left) = (0.0, 0.0, 0.0);
        for w in order.windows(2) {
            let (i, next) = (w[0], w[1]);
            r_left += resid[i];
            h_left += hess[i];
            n_left += 1.0;
            let (v, v_next) = (x[[i, j]], x[[next, j]]);
            if v == v_next {
                continue;
            }
            let r_right = total_r - r_left;
            let gain = r_left * r_left / n_left + r_right * r_right / (n - n_left);
            if best.as_ref().map_or(true, |(g, _)| gain > *g) {
                best = Some((
                    gain,
                    Stump {
                        feature: j,
                        threshold: (v + v_next) / 2.0,
                        left: newton_step(r_left, h_left),
                        right: newton_step(r_right, total_h - h_left),
                    },
                ));
            }
        }
    }
    best.map(|(_, s)| s)
}

impl Trainer for GradientBoostTrainer {
    fn describe(&self) -> String {
        format!(
            "n_estimators={} learning_rate={:.4}",
            self.n_estimators, self.learning_rate
        )
    }

    fn fit(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
        let (n, p) = x.dim();
        if n == 0 || p == 0 {
            return Err(ModelError::Shape(format!("cannot boost on a {n} x {p} matrix")));
        }
        let target: Vec<f64> = y.iter().map(|&c| if c == 1 { 1.0 } else { 0.0 }).collect();
        let prevalence = (target.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let initial = (prevalence / (1.0 - prevalence)).ln();

        let sorted: Vec<Vec<usize>> = (0..p)
            .map(|j| {
                let mut order: Vec<usize> = (0..n).collect();
                order.sort_by(|&a, &b| x[[a, j]].total_cmp(&x[[b, j]]));
                order
            })
            .collect();

        let mut f = vec![initial; n];
        let mut stumps = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let prob: Vec<f64> = f.iter().map(|&v| sigmoid(v)).collect();
            let resid: Vec<f64> = target.iter().zip(&prob).map(|(t, q)| t - q).collect();
            let hess: Vec<f64> = prob.iter().map(|q| q * (1.0 - q)).collect();

            let Some(stump) = fit_stump(x, &sorted, &resid, &hess) else {
                break; // every feature is constant
            };
            for (i, row) in x.rows().into_iter().enumerate() {
                f[i] += self.learning_rate * stump.predict(row);
            }
            stumps.push(stump);
        }

        Ok(Box::new(FittedBoost {
            initial,
            learning_rate: self.learning_rate,
            stumps,
        }))
    }

    fn boxed_clone(&self) -> Box<dyn Trainer> {
        Box::new(self.clone())
    }

    fn sample(&self, rng: &mut StdRng) -> Option<Box<dyn Trainer>> {
        Some(Box::new(Self {
            n_estimators: [50, 100, 200, 400][rng.gen_range(0..4)],
            learning_rate: 10f64.powf(rng.gen_range(-2.0..-0.5)),
        }))
    }
}
