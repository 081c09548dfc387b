//! k-nearest neighbours on z-scored features (brute-force Euclidean).
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use super::{FittedModel, Standardizer, Trainer};
use crate::error::ModelError;

/// KNN hyperparameters.
#[derive(Debug, Clone)]
pub struct KnnTrainer {
    /// Neighbours that vote.
    pub k: usize,
    /// Weight votes by inverse distance instead of uniformly.
    pub distance_weighted: bool,
}

impl Default for KnnTrainer {
    fn default() -> Self {
        Self {
            k: 5,
            distance_weighted: false,
        }
    }
}

struct FittedKnn {
    k: usize,
    distance_weighted: bool,
    scaler: Standardizer,
    x: Array2<f64>,
    y: Array1<usize>,
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(u, v)| (u - v) * (u - v)).sum()
}

impl FittedModel for FittedKnn {
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let z = self.scaler.transform(x);
        let k = self.k.min(self.x.nrows()).max(1);

        let mut out = Array1::zeros(z.nrows());
        for (i, row) in z.rows().into_iter().enumerate() {
            let mut dists: Vec<(f64, usize)> = self
                .x
                .rows()
                .into_iter()
                .zip(self.y.iter())
                .map(|(t, &label)| (sq_dist(row, t), label))
                .collect();
            // stable: equal distances keep training-row order
            dists.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (mut pos, mut total) = (0.0, 0.0);
            for &(d2, label) in dists.iter().take(k) {
                let w = if self.distance_weighted {
                    1.0 / (d2.sqrt() + 1e-9)
                } else {
                    1.0
                };
                total += w;
                if label == 1 {
                    pos += w;
                }
            }
            out[i] = if total > 0.0 { pos / total } else { 0.0 };
        }
        out
    }
}

impl Trainer for KnnTrainer {
    fn describe(&self) -> String {
        format!("k={} distance_weighted={}", self.k, self.distance_weighted)
    }

    fn fit(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<Box<dyn FittedModel>, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::Shape("cannot fit KNN on an empty matrix".into()));
        }
        if x.nrows() != y.len() {
            return Err(ModelError::Shape("labels length does not match rows".into()));
        }
        let scaler = Standardizer::fit(x);
        Ok(Box::new(FittedKnn {
            k: self.k,
            distance_weighted: self.distance_weighted,
            x: scaler.transform(x),
            scaler,
            y: y.clone(),
        }))
    }

    fn boxed_clone(&self) -> Box<dyn Trainer> {
        Box::new(self.clone())
    }

    fn sample(&self, rng: &mut StdRng) -> Option<Box<dyn Trainer>> {
        Some(Box::new(Self {
            k: 2 * rng.gen_range(0..13) + 1,
            distance_weighted: rng.gen_bool(0.5),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn votes_follow_the_nearest_rows() {
        let x = array![[0.0], [0.1], [0.2], [5.0], [5.1], [5.2]];
        let y = Array1::from_vec(vec![0, 0, 0, 1, 1, 1]);
        let model = KnnTrainer { k: 3, distance_weighted: false }.fit(&x, &y).unwrap();
        let p = model.predict_proba(&array![[0.05], [5.05]]);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[1], 1.0);
    }

    #[test]
    fn k_larger_than_training_set_is_capped() {
        let x = array![[0.0], [1.0]];
        let y = Array1::from_vec(vec![0, 1]);
        let model = KnnTrainer { k: 50, distance_weighted: false }.fit(&x, &y).unwrap();
        let p = model.predict_proba(&array![[0.0]]);
        assert!((p[0] - 0.5).abs() < 1e-12);
    }
}
