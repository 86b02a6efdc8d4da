use crate::error::ModelError;
use crate::forest::ForestParams;
use crate::gbt::GbtParams;
use crate::logistic::LogisticParams;
use crate::tree::{SplitRule, TreeParams};
use core_types::{AlgorithmId, CoreError, Hyperparams, Lcg};
use ndarray::ArrayView2;

pub mod artifact;
pub mod error;
pub mod forest;
pub mod gbt;
pub mod logistic;
pub mod tree;

pub use artifact::{deserialize_artifact, serialize_artifact};
pub use forest::ForestModel;
pub use gbt::GbtModel;
pub use logistic::LogisticModel;
pub use tree::Node;

/// The trained parameters of one algorithm. A sum type instead of a
/// trait object so the artifact layer can dispatch on the variant and
/// serialization stays a plain data concern.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    LogReg(LogisticModel),
    Tree(Node),
    Forest(ForestModel),
    Gbt(GbtModel),
}

/// A trained model plus the feature-name vector that defines its input
/// space. The feature names in the serialized artifact are the ground
/// truth for alignment at scoring time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub algorithm: AlgorithmId,
    pub feature_names: Vec<String>,
    pub model: Model,
}

impl TrainedModel {
    /// Probability in [0, 1] for one dense row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match &self.model {
            Model::LogReg(m) => m.predict(row),
            Model::Tree(root) => root.predict(row),
            Model::Forest(m) => m.predict(row),
            Model::Gbt(m) => m.predict(row),
        }
    }

    pub fn predict_batch(&self, x: &ArrayView2<'_, f64>) -> Vec<f64> {
        let mut scores = Vec::with_capacity(x.nrows());
        let mut row_buf = vec![0.0; x.ncols()];
        for row in x.rows() {
            for (dst, src) in row_buf.iter_mut().zip(row.iter()) {
                *dst = *src;
            }
            scores.push(self.predict_row(&row_buf));
        }
        scores
    }
}

/// Trains one algorithm on a dense matrix. The label vector must contain
/// both classes; the matrix must be non-empty and agree with
/// `feature_names`.
pub fn train(
    algorithm: AlgorithmId,
    x: &ArrayView2<'_, f64>,
    y: &[f64],
    hyperparams: &Hyperparams,
    feature_names: &[String],
) -> Result<TrainedModel, ModelError> {
    if x.nrows() == 0 || y.is_empty() {
        return Err(CoreError::InvalidInput("empty training matrix".to_string()).into());
    }
    if x.nrows() != y.len() {
        return Err(CoreError::InvalidInput(format!(
            "matrix has {} rows but {} labels",
            x.nrows(),
            y.len()
        ))
        .into());
    }
    if x.ncols() != feature_names.len() {
        return Err(CoreError::InvalidInput(format!(
            "matrix has {} columns but {} feature names",
            x.ncols(),
            feature_names.len()
        ))
        .into());
    }
    let positives = y.iter().filter(|v| **v >= 0.5).count();
    if positives == y.len() {
        return Err(CoreError::InvalidInput("no negative labels".to_string()).into());
    }
    if positives == 0 {
        return Err(CoreError::InvalidInput("no positive labels".to_string()).into());
    }

    tracing::debug!(
        algorithm = %algorithm,
        samples = x.nrows(),
        features = x.ncols(),
        "training candidate"
    );

    let model = match algorithm {
        AlgorithmId::LogReg => {
            let defaults = LogisticParams::default();
            let params = LogisticParams {
                epochs: hyperparams.epochs.unwrap_or(defaults.epochs),
                learning_rate: hyperparams.learning_rate.unwrap_or(defaults.learning_rate),
                c: hyperparams.c.unwrap_or(defaults.c),
            };
            Model::LogReg(logistic::train(x, y, &params))
        }
        AlgorithmId::DecisionTree | AlgorithmId::ExtraTree => {
            let split_rule = if algorithm == AlgorithmId::DecisionTree {
                SplitRule::Midpoints
            } else {
                SplitRule::RandomUniform
            };
            let defaults = TreeParams::classification_defaults(split_rule);
            let params = TreeParams {
                max_depth: hyperparams.max_depth.unwrap_or(defaults.max_depth),
                min_samples_split: hyperparams
                    .min_samples_split
                    .unwrap_or(defaults.min_samples_split),
                min_samples_leaf: hyperparams
                    .min_samples_leaf
                    .unwrap_or(defaults.min_samples_leaf),
                split_rule,
            };
            let indices: Vec<usize> = (0..x.nrows()).collect();
            let mut rng = Lcg::new(hyperparams.seed);
            Model::Tree(tree::grow_classification_tree(x, y, &indices, &params, &mut rng))
        }
        AlgorithmId::RandomForest | AlgorithmId::ExtraTrees => {
            let split_rule = if algorithm == AlgorithmId::RandomForest {
                SplitRule::Midpoints
            } else {
                SplitRule::RandomUniform
            };
            let defaults = ForestParams::default();
            let params = ForestParams {
                n_estimators: hyperparams.n_estimators.unwrap_or(defaults.n_estimators),
                max_depth: hyperparams.max_depth.unwrap_or(defaults.max_depth),
                min_samples_split: hyperparams
                    .min_samples_split
                    .unwrap_or(defaults.min_samples_split),
                min_samples_leaf: hyperparams
                    .min_samples_leaf
                    .unwrap_or(defaults.min_samples_leaf),
                seed: hyperparams.seed,
            };
            Model::Forest(forest::train(x, y, &params, split_rule))
        }
        AlgorithmId::GradientBoosted => {
            let defaults = GbtParams::default();
            let params = GbtParams {
                n_estimators: hyperparams.n_estimators.unwrap_or(defaults.n_estimators),
                max_depth: hyperparams.max_depth.unwrap_or(defaults.max_depth),
                learning_rate: hyperparams.learning_rate.unwrap_or(defaults.learning_rate),
                seed: hyperparams.seed,
            };
            Model::Gbt(gbt::train(x, y, &params))
        }
    };

    Ok(TrainedModel { algorithm, feature_names: feature_names.to_vec(), model })
}
