use crate::error::FeatureError;
use core_types::{CoreError, NormalizationContext};
use ndarray::Array2;

pub mod builder;
pub mod error;

pub use builder::{build_features, parse_label, FeatureMode};

/// The dense output of the feature builder: a row-major matrix, the
/// ordered feature names that describe its columns, an optional label
/// vector, and the normalization context the matrix was built with.
#[derive(Debug, Clone)]
pub struct BuiltFeatures {
    pub x: Array2<f64>,
    pub y: Option<Vec<f64>>,
    pub feature_names: Vec<String>,
    pub context: NormalizationContext,
}

impl BuiltFeatures {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Training requires a binary problem: both classes must be present.
pub fn validate_binary_labels(y: &[f64]) -> Result<(), FeatureError> {
    let positives = y.iter().filter(|v| **v >= 0.5).count();
    if positives == 0 {
        return Err(FeatureError::Core(CoreError::InvalidInput(
            "no positive labels".to_string(),
        )));
    }
    if positives == y.len() {
        return Err(FeatureError::Core(CoreError::InvalidInput(
            "no negative labels".to_string(),
        )));
    }
    Ok(())
}
