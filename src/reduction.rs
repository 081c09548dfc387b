//! Optional principal-component projection of the feature frames.
//!
//! The projection is fitted on the training frame only and then applied to
//! both frames, so nothing about the test rows leaks into it.
use linfa::prelude::*;
use linfa_reduction::Pca;
use log::info;

use crate::error::{ModelError, PipelineError, Result};
use crate::features::FeatureFrame;

/// Project `train` and `test` onto the first `components` principal axes of
/// `train`. The count is capped by the training frame's shape.
pub fn project_pair(
    train: &FeatureFrame,
    test: &FeatureFrame,
    components: usize,
) -> Result<(FeatureFrame, FeatureFrame)> {
    let k = components.min(train.x.ncols()).min(train.x.nrows());
    if k == 0 {
        return Err(PipelineError::SchemaMismatch(format!(
            "cannot project a {} x {} frame onto {components} components",
            train.x.nrows(),
            train.x.ncols()
        )));
    }

    let dataset = Dataset::new(train.x.clone(), train.y.clone());
    let pca = Pca::params(k).fit(&dataset).map_err(|e| {
        PipelineError::Model(ModelError::Fit {
            model: "PCA".into(),
            message: e.to_string(),
        })
    })?;
    info!("PCA: {} columns -> {k} components", train.x.ncols());

    let columns: Vec<String> = (1..=k).map(|i| format!("PC{i}")).collect();
    let project = |frame: &FeatureFrame| FeatureFrame {
        columns: columns.clone(),
        x: pca.predict(&frame.x),
        y: frame.y.clone(),
    };
    Ok((project(train), project(test)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn frame(n: usize) -> FeatureFrame {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => ((i * 7) % 5) as f64,
            _ => ((i * i) % 11) as f64,
        });
        FeatureFrame {
            columns: vec!["a".into(), "b".into(), "c".into()],
            x,
            y: Array1::from_shape_fn(n, |i| i % 2),
        }
    }

    #[test]
    fn projects_both_sides_with_renamed_columns() {
        let (train, test) = project_pair(&frame(12), &frame(4), 2).unwrap();
        assert_eq!(train.columns, vec!["PC1".to_string(), "PC2".to_string()]);
        assert_eq!(train.x.shape(), &[12, 2]);
        assert_eq!(test.x.shape(), &[4, 2]);
        assert_eq!(test.y, frame(4).y);
    }

    #[test]
    fn component_count_is_capped_by_columns() {
        let (train, _) = project_pair(&frame(12), &frame(4), 10).unwrap();
        assert_eq!(train.x.ncols(), 3);
    }
}
