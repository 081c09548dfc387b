//! Class balancing of the training partition.
//!
//! When inactives outnumber actives, synthetic actives are generated with
//! SMOTE: pick a random active row, pick one of its `k` nearest active
//! neighbours, and interpolate at a random point between them. Synthetic rows
//! are appended after the original rows. The test partition is never touched.
use log::info;
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};
use crate::features::FeatureFrame;

/// Neighbours considered per minority row.
pub const SMOTE_NEIGHBORS: usize = 5;

/// Class counts around the balancing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceReport {
    /// `(negatives, positives)` before.
    pub before: (usize, usize),
    /// `(negatives, positives)` after.
    pub after: (usize, usize),
}

impl BalanceReport {
    /// Whether SMOTE added any rows.
    pub fn applied(&self) -> bool {
        self.before != self.after
    }

    /// Key/value pairs for the `Balance` result block.
    pub fn entries(&self) -> Vec<(String, String)> {
        vec![
            ("inactive before".to_string(), self.before.0.to_string()),
            ("active before".to_string(), self.before.1.to_string()),
            ("inactive after".to_string(), self.after.0.to_string()),
            ("active after".to_string(), self.after.1.to_string()),
        ]
    }
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(u, v)| (u - v) * (u - v)).sum()
}

/// Oversample actives up to the inactive count if inactives are the strict
/// majority; otherwise return the frame unchanged.
pub fn balance(train: FeatureFrame, seed: u64) -> Result<(FeatureFrame, BalanceReport)> {
    let before = train.class_counts();
    let (neg, pos) = before;
    if neg <= pos {
        return Ok((train, BalanceReport { before, after: before }));
    }
    if pos == 0 {
        return Err(PipelineError::DegeneratePartition {
            data_set: "training set".into(),
            message: "no active rows to oversample".into(),
        });
    }

    let minority: Vec<usize> = (0..train.y.len()).filter(|&i| train.y[i] == 1).collect();
    let x_min = train.x.select(Axis(0), &minority);
    let neighbors = nearest_neighbors(&x_min, SMOTE_NEIGHBORS);

    let n_new = neg - pos;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut synthetic = Array2::<f64>::zeros((n_new, train.x.ncols()));
    for mut row in synthetic.rows_mut() {
        let i = rng.gen_range(0..x_min.nrows());
        let base = x_min.row(i);
        match neighbors[i].as_slice() {
            [] => row.assign(&base),
            nn => {
                let j = nn[rng.gen_range(0..nn.len())];
                let gap: f64 = rng.gen();
                let other = x_min.row(j);
                row.assign(&(&base + &((&other - &base) * gap)));
            }
        }
    }

    let x = concatenate(Axis(0), &[train.x.view(), synthetic.view()])
        .map_err(|e| PipelineError::SchemaMismatch(e.to_string()))?;
    let y = concatenate(
        Axis(0),
        &[train.y.view(), Array1::from_elem(n_new, 1usize).view()],
    )
    .map_err(|e| PipelineError::SchemaMismatch(e.to_string()))?;

    let balanced = FeatureFrame {
        columns: train.columns,
        x,
        y,
    };
    let report = BalanceReport {
        before,
        after: balanced.class_counts(),
    };
    info!("SMOTE: {:?} -> {:?} (inactive, active)", report.before, report.after);
    Ok((balanced, report))
}

/// Indices of the `k` nearest other rows for every row (ties by index).
fn nearest_neighbors(x: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = x.nrows();
    (0..n)
        .map(|i| {
            let mut others: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (sq_dist(x.row(i), x.row(j)), j))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0));
            others.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}
