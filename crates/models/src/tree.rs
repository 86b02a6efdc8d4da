use core_types::Lcg;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// A decision-tree node. Leaves hold a probability for classification
/// trees and a residual for the boosted regression trees. The serialized
/// form is the nested `{type:"leaf"|"split", ...}` document used by the
/// artifact format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        #[serde(rename = "featureIndex")]
        feature_index: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Walks the tree for one sample. Values at or below the threshold
    /// go left.
    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split { feature_index, threshold, left, right } => {
                if row[*feature_index] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    /// Maximum depth, counting a lone leaf as 0.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// How candidate thresholds are generated at a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// Midpoints between consecutive sorted unique values, capped at 20
    /// candidates (20 random midpoints when there are more than 21
    /// unique values).
    Midpoints,
    /// One threshold per feature, drawn uniformly between the observed
    /// min and max. Zero-variance features are skipped.
    RandomUniform,
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub split_rule: SplitRule,
}

impl TreeParams {
    pub fn classification_defaults(split_rule: SplitRule) -> Self {
        Self { max_depth: 8, min_samples_split: 5, min_samples_leaf: 2, split_rule }
    }
}

const MAX_THRESHOLD_CANDIDATES: usize = 20;

/// Grows a binary classification tree over the given sample indices.
/// Leaf values are the positive-label fraction of the samples that
/// reached the leaf.
pub fn grow_classification_tree(
    x: &ArrayView2<'_, f64>,
    y: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut Lcg,
) -> Node {
    grow(x, y, indices, 0, params, rng, Criterion::Gini)
}

/// Grows a regression tree minimizing weighted MSE. Leaf values are the
/// mean target of the samples that reached the leaf.
pub fn grow_regression_tree(
    x: &ArrayView2<'_, f64>,
    targets: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut Lcg,
) -> Node {
    grow(x, targets, indices, 0, params, rng, Criterion::Mse)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Criterion {
    Gini,
    Mse,
}

// Positive fraction for 0/1 labels, mean for regression targets.
fn leaf_value(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn grow(
    x: &ArrayView2<'_, f64>,
    y: &[f64],
    indices: &[usize],
    depth: usize,
    params: &TreeParams,
    rng: &mut Lcg,
    criterion: Criterion,
) -> Node {
    let value = leaf_value(y, indices);

    if depth >= params.max_depth || indices.len() < params.min_samples_split {
        return Node::Leaf { value };
    }
    let first = y[indices[0]];
    if indices.iter().all(|&i| y[i] == first) {
        return Node::Leaf { value };
    }

    let Some(split) = find_best_split(x, y, indices, params, rng, criterion) else {
        return Node::Leaf { value };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| x[[i, split.feature]] <= split.threshold);

    let left = grow(x, y, &left_idx, depth + 1, params, rng, criterion);
    let right = grow(x, y, &right_idx, depth + 1, params, rng, criterion);
    Node::Split {
        feature_index: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
}

fn find_best_split(
    x: &ArrayView2<'_, f64>,
    y: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut Lcg,
    criterion: Criterion,
) -> Option<BestSplit> {
    let n_features = x.ncols();
    let mut best: Option<(f64, BestSplit)> = None;

    for feature in 0..n_features {
        let values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        for threshold in candidate_thresholds(&values, params.split_rule, rng) {
            let (mut n_left, mut n_right) = (0usize, 0usize);
            let (mut sum_left, mut sum_right) = (0.0f64, 0.0f64);
            let (mut sq_left, mut sq_right) = (0.0f64, 0.0f64);
            for (&i, &v) in indices.iter().zip(values.iter()) {
                let target = y[i];
                if v <= threshold {
                    n_left += 1;
                    sum_left += target;
                    sq_left += target * target;
                } else {
                    n_right += 1;
                    sum_right += target;
                    sq_right += target * target;
                }
            }
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }
            let score = match criterion {
                Criterion::Gini => {
                    weighted_gini(n_left, sum_left, n_right, sum_right)
                }
                Criterion::Mse => {
                    weighted_mse(n_left, sum_left, sq_left, n_right, sum_right, sq_right)
                }
            };
            // Strict comparison keeps the first-seen split on ties.
            let improved = best.as_ref().map(|(s, _)| score < *s).unwrap_or(true);
            if improved {
                best = Some((score, BestSplit { feature, threshold }));
            }
        }
    }

    best.map(|(_, split)| split)
}

/// Weighted Gini impurity of a candidate partition of 0/1 labels, where
/// `sum` is the positive count on each side.
fn weighted_gini(n_left: usize, sum_left: f64, n_right: usize, sum_right: f64) -> f64 {
    let gini = |n: usize, positives: f64| -> f64 {
        if n == 0 {
            return 0.0;
        }
        let p1 = positives / n as f64;
        let p0 = 1.0 - p1;
        1.0 - p0 * p0 - p1 * p1
    };
    let total = (n_left + n_right) as f64;
    (n_left as f64 * gini(n_left, sum_left) + n_right as f64 * gini(n_right, sum_right)) / total
}

/// Weighted mean squared error of a candidate partition, computed from
/// running sums so each candidate is a single pass.
fn weighted_mse(
    n_left: usize,
    sum_left: f64,
    sq_left: f64,
    n_right: usize,
    sum_right: f64,
    sq_right: f64,
) -> f64 {
    let sse = |n: usize, sum: f64, sq: f64| -> f64 {
        if n == 0 {
            return 0.0;
        }
        sq - sum * sum / n as f64
    };
    let total = (n_left + n_right) as f64;
    (sse(n_left, sum_left, sq_left) + sse(n_right, sum_right, sq_right)) / total
}

fn candidate_thresholds(values: &[f64], rule: SplitRule, rng: &mut Lcg) -> Vec<f64> {
    match rule {
        SplitRule::Midpoints => {
            let mut unique = values.to_vec();
            unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            unique.dedup();
            if unique.len() < 2 {
                return Vec::new();
            }
            if unique.len() <= MAX_THRESHOLD_CANDIDATES + 1 {
                unique.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
            } else {
                (0..MAX_THRESHOLD_CANDIDATES)
                    .map(|_| {
                        let i = rng.index(unique.len() - 1);
                        (unique[i] + unique[i + 1]) / 2.0
                    })
                    .collect()
            }
        }
        SplitRule::RandomUniform => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !(min < max) {
                return Vec::new();
            }
            vec![rng.range(min, max)]
        }
    }
}
