use core_types::CoreError;
use storage::StorageError;
use thiserror::Error;

/// Scoring failures carry the pipeline stage so a failed run can report
/// where it died and why.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Review rate {0} is outside (0, 1]")]
    InvalidReviewRate(f64),

    #[error("Load stage failed: {0}")]
    Load(String),

    #[error("Align stage failed: {0}")]
    Align(String),

    #[error("Predict stage failed: {0}")]
    Predict(String),

    #[error("Emit stage failed: {0}")]
    Emit(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
