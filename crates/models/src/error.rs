use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Artifact encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
