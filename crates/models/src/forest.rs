use crate::tree::{grow_classification_tree, Node, SplitRule, TreeParams};
use core_types::Lcg;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// A bagged ensemble of decision trees. Each tree was trained on a
/// bootstrap sample over a random feature subset; `feature_subsets[t]`
/// maps tree `t`'s local feature indices back to the global feature
/// space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<Node>,
    pub feature_subsets: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_estimators: 20, max_depth: 10, min_samples_split: 5, min_samples_leaf: 2, seed: 42 }
    }
}

/// Trains a bagged forest. `split_rule` selects between the standard
/// random-forest trees (best midpoint split) and the extra-trees variant
/// (one uniform-random threshold per feature).
///
/// The ensemble owns one generator (seeded with the base seed) for the
/// bootstrap and Fisher-Yates feature-subset draws; each member tree
/// trains with its own generator seeded `base + index + 1`.
pub fn train(
    x: &ArrayView2<'_, f64>,
    y: &[f64],
    params: &ForestParams,
    split_rule: SplitRule,
) -> ForestModel {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let subset_size = ((n_features as f64).sqrt().round() as usize).clamp(1, n_features);

    let mut ensemble_rng = Lcg::new(params.seed);
    let tree_params = TreeParams {
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        min_samples_leaf: params.min_samples_leaf,
        split_rule,
    };

    let mut trees = Vec::with_capacity(params.n_estimators);
    let mut feature_subsets = Vec::with_capacity(params.n_estimators);

    for tree_index in 0..params.n_estimators {
        let bootstrap: Vec<usize> =
            (0..n_samples).map(|_| ensemble_rng.index(n_samples)).collect();
        let subset = ensemble_rng.sample_without_replacement(n_features, subset_size);

        // Materialize the bootstrap rows over the subsetted columns so the
        // tree sees a dense local feature space.
        let sub_x = Array2::from_shape_fn((bootstrap.len(), subset.len()), |(i, j)| {
            x[[bootstrap[i], subset[j]]]
        });
        let sub_y: Vec<f64> = bootstrap.iter().map(|&i| y[i]).collect();
        let indices: Vec<usize> = (0..bootstrap.len()).collect();

        let mut tree_rng = Lcg::new(params.seed + tree_index as u64 + 1);
        let tree =
            grow_classification_tree(&sub_x.view(), &sub_y, &indices, &tree_params, &mut tree_rng);

        trees.push(tree);
        feature_subsets.push(subset);
    }

    ForestModel { trees, feature_subsets }
}

impl ForestModel {
    /// Average of per-tree probabilities, remapping each tree's local
    /// feature indices through its stored subset.
    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .trees
            .iter()
            .zip(self.feature_subsets.iter())
            .map(|(tree, subset)| {
                let local: Vec<f64> = subset.iter().map(|&g| row[g]).collect();
                tree.predict(&local)
            })
            .sum();
        total / self.trees.len() as f64
    }
}
