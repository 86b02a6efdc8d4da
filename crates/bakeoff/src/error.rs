use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BakeoffError {
    #[error("Review rate {0} is outside (0, 1]")]
    InvalidReviewRate(f64),

    #[error("Bake-off has no candidates")]
    NoCandidates,

    #[error("All {0} candidates failed to train")]
    AllCandidatesFailed(usize),

    #[error("Bake-off was cancelled after {done} of {total} candidates")]
    Cancelled { done: usize, total: usize },

    #[error("Dataset error: {0}")]
    Dataset(#[from] dataset::error::DatasetError),

    #[error("Feature error: {0}")]
    Feature(#[from] features::error::FeatureError),

    #[error(transparent)]
    Rubric(#[from] rubric::error::RubricError),

    #[error(transparent)]
    Storage(#[from] storage::StorageError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
