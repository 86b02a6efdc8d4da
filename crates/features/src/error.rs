use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Label column '{0}' not found in dataset")]
    MissingLabel(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
