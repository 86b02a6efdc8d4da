use crate::error::ExplainError;
use core_types::Lcg;
use models::{Model, Node, TrainedModel};
use ndarray::ArrayView2;
use std::collections::BTreeMap;

const DEFAULT_GLOBAL_SAMPLES: usize = 10_000;
const GLOBAL_SAMPLE_SEED: u64 = 42;

/// Per-row feature attributions. For logistic regression the
/// contributions are exact and sum to `margin - base_value`; for tree
/// models they come from the path-based approximation and additivity is
/// not guaranteed.
#[derive(Debug, Clone)]
pub struct ShapExplanation {
    pub base_value: f64,
    pub contributions: Vec<f64>,
}

/// Mean absolute attribution per feature over a sampled set of rows.
#[derive(Debug, Clone)]
pub struct GlobalShap {
    pub mean_abs: BTreeMap<String, f64>,
    /// Feature names with their mean |SHAP|, descending.
    pub ranked: Vec<(String, f64)>,
}

/// Computes local attributions for one dense row in the model's global
/// feature space.
pub fn local_shap(
    model: &TrainedModel,
    row: &[f64],
    column_means: &[f64],
) -> Result<ShapExplanation, ExplainError> {
    let expected = model.feature_names.len();
    if row.len() != expected {
        return Err(ExplainError::RowWidthMismatch { row: row.len(), expected });
    }

    let explanation = match &model.model {
        Model::LogReg(m) => {
            // Linear SHAP is exact: phi_i = w_i * (x_i - mean_i) around the
            // mean-centered baseline.
            let base_value = m.bias
                + m.weights
                    .iter()
                    .zip(column_means.iter())
                    .map(|(w, mean)| w * mean)
                    .sum::<f64>();
            let contributions = m
                .weights
                .iter()
                .zip(row.iter().zip(column_means.iter()))
                .map(|(w, (x, mean))| w * (x - mean))
                .collect();
            ShapExplanation { base_value, contributions }
        }
        Model::Tree(root) => {
            let mut contributions = vec![0.0; expected];
            let base_value = tree_path_shap(root, row, &mut contributions);
            ShapExplanation { base_value, contributions }
        }
        Model::Forest(m) => {
            let mut contributions = vec![0.0; expected];
            let mut base_total = 0.0;
            for (tree, subset) in m.trees.iter().zip(m.feature_subsets.iter()) {
                let local_row: Vec<f64> = subset.iter().map(|&g| row[g]).collect();
                let mut local = vec![0.0; subset.len()];
                base_total += tree_path_shap(tree, &local_row, &mut local);
                for (j, contribution) in local.into_iter().enumerate() {
                    contributions[subset[j]] += contribution;
                }
            }
            let n_trees = m.trees.len().max(1) as f64;
            for contribution in contributions.iter_mut() {
                *contribution /= n_trees;
            }
            ShapExplanation { base_value: base_total / n_trees, contributions }
        }
        Model::Gbt(m) => {
            let mut contributions = vec![0.0; expected];
            let mut local = vec![0.0; expected];
            for tree in &m.trees {
                local.iter_mut().for_each(|v| *v = 0.0);
                tree_path_shap(tree, row, &mut local);
                for (dst, src) in contributions.iter_mut().zip(local.iter()) {
                    *dst += m.learning_rate * src;
                }
            }
            ShapExplanation { base_value: m.base_prediction, contributions }
        }
    };
    Ok(explanation)
}

/// Path-based TreeSHAP approximation. The baseline is the recursive
/// unweighted average of leaf values; each split on the sample's path
/// attributes the difference between the leaf the sample reaches and the
/// expectation of the split's subtree to the split feature. Coverage
/// weights are deliberately ignored.
fn tree_path_shap(root: &Node, row: &[f64], contributions: &mut [f64]) -> f64 {
    let baseline = expected_value(root);
    let mut node = root;
    loop {
        match node {
            Node::Leaf { .. } => break,
            Node::Split { feature_index, threshold, left, right } => {
                let child: &Node =
                    if row[*feature_index] <= *threshold { left } else { right };
                let reached_leaf = child.predict(row);
                contributions[*feature_index] += reached_leaf - expected_value(node);
                node = child;
            }
        }
    }
    baseline
}

/// Unweighted expectation of a subtree: leaves count equally regardless
/// of training coverage.
fn expected_value(node: &Node) -> f64 {
    match node {
        Node::Leaf { value } => *value,
        Node::Split { left, right, .. } => (expected_value(left) + expected_value(right)) / 2.0,
    }
}

/// Mean |SHAP| per feature over up to `max_samples` rows sampled
/// uniformly without replacement (every row when the matrix is small
/// enough).
pub fn global_shap(
    model: &TrainedModel,
    x: &ArrayView2<'_, f64>,
    column_means: &[f64],
    max_samples: Option<usize>,
) -> Result<GlobalShap, ExplainError> {
    let n_samples = x.nrows();
    let n_features = model.feature_names.len();
    let cap = max_samples.unwrap_or(DEFAULT_GLOBAL_SAMPLES);

    let sample_indices: Vec<usize> = if n_samples <= cap {
        (0..n_samples).collect()
    } else {
        let mut rng = Lcg::new(GLOBAL_SAMPLE_SEED);
        rng.sample_without_replacement(n_samples, cap)
    };
    tracing::debug!(rows = n_samples, sampled = sample_indices.len(), "computing global SHAP");

    let mut totals = vec![0.0; n_features];
    let mut row_buf = vec![0.0; n_features];
    for &i in &sample_indices {
        for (dst, src) in row_buf.iter_mut().zip(x.row(i).iter()) {
            *dst = *src;
        }
        let explanation = local_shap(model, &row_buf, column_means)?;
        for (total, contribution) in totals.iter_mut().zip(explanation.contributions.iter()) {
            *total += contribution.abs();
        }
    }

    let count = sample_indices.len().max(1) as f64;
    let mean_abs: BTreeMap<String, f64> = model
        .feature_names
        .iter()
        .cloned()
        .zip(totals.into_iter().map(|t| t / count))
        .collect();

    let mut ranked: Vec<(String, f64)> =
        mean_abs.iter().map(|(name, value)| (name.clone(), *value)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    Ok(GlobalShap { mean_abs, ranked })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::AlgorithmId;
    use models::{ForestModel, GbtModel, LogisticModel};
    use ndarray::array;

    fn logistic_model() -> TrainedModel {
        TrainedModel {
            algorithm: AlgorithmId::LogReg,
            feature_names: vec!["a".into(), "b".into()],
            model: Model::LogReg(LogisticModel { weights: vec![2.0, -1.0], bias: 0.5 }),
        }
    }

    #[test]
    fn linear_shap_is_additive_to_the_margin() {
        let model = logistic_model();
        let means = [0.3, 0.6];
        let row = [1.2, -0.4];
        let explanation = local_shap(&model, &row, &means).unwrap();
        let margin = 0.5 + 2.0 * 1.2 - 1.0 * -0.4;
        let reconstructed =
            explanation.base_value + explanation.contributions.iter().sum::<f64>();
        assert!((reconstructed - margin).abs() < 1e-6);
    }

    #[test]
    fn tree_path_attribution_uses_unweighted_expectations() {
        let root = Node::Split {
            feature_index: 0,
            threshold: 0.0,
            left: Box::new(Node::Leaf { value: 0.2 }),
            right: Box::new(Node::Leaf { value: 0.8 }),
        };
        let model = TrainedModel {
            algorithm: AlgorithmId::DecisionTree,
            feature_names: vec!["a".into()],
            model: Model::Tree(root),
        };
        let explanation = local_shap(&model, &[1.0], &[0.0]).unwrap();
        // baseline = (0.2 + 0.8) / 2; the sample reaches the 0.8 leaf
        assert!((explanation.base_value - 0.5).abs() < 1e-12);
        assert!((explanation.contributions[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn forest_contributions_are_remapped_to_global_indices() {
        let tree = Node::Split {
            feature_index: 0,
            threshold: 0.5,
            left: Box::new(Node::Leaf { value: 0.0 }),
            right: Box::new(Node::Leaf { value: 1.0 }),
        };
        let model = TrainedModel {
            algorithm: AlgorithmId::RandomForest,
            feature_names: vec!["a".into(), "b".into(), "c".into()],
            model: Model::Forest(ForestModel {
                trees: vec![tree],
                // the tree's local feature 0 is global feature 2
                feature_subsets: vec![vec![2]],
            }),
        };
        let explanation = local_shap(&model, &[0.0, 0.0, 1.0], &[0.0; 3]).unwrap();
        assert_eq!(explanation.contributions[0], 0.0);
        assert_eq!(explanation.contributions[1], 0.0);
        assert!((explanation.contributions[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn gbt_contributions_scale_with_learning_rate() {
        let tree = Node::Split {
            feature_index: 0,
            threshold: 0.0,
            left: Box::new(Node::Leaf { value: -0.4 }),
            right: Box::new(Node::Leaf { value: 0.4 }),
        };
        let model = TrainedModel {
            algorithm: AlgorithmId::GradientBoosted,
            feature_names: vec!["a".into()],
            model: Model::Gbt(GbtModel {
                base_prediction: -1.0,
                learning_rate: 0.1,
                trees: vec![tree.clone(), tree],
            }),
        };
        let explanation = local_shap(&model, &[1.0], &[0.0]).unwrap();
        assert_eq!(explanation.base_value, -1.0);
        // two trees, each attributing 0.4 - 0.0, scaled by the 0.1 rate
        assert!((explanation.contributions[0] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn global_shap_ranks_features_descending() {
        let model = logistic_model();
        let x = array![[1.0, 0.1], [0.8, -0.1], [-0.9, 0.2], [0.4, 0.0]];
        let means = [0.075, 0.05];
        let global = global_shap(&model, &x.view(), &means, None).unwrap();
        assert_eq!(global.ranked[0].0, "a");
        assert!(global.ranked[0].1 >= global.ranked[1].1);
        assert_eq!(global.mean_abs.len(), 2);
    }

    #[test]
    fn row_width_mismatch_is_reported() {
        let model = logistic_model();
        assert!(matches!(
            local_shap(&model, &[1.0], &[0.0, 0.0]),
            Err(ExplainError::RowWidthMismatch { .. })
        ));
    }
}
