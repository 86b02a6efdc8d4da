use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Feature alignment: {0}")]
    FeatureAlignment(String),

    #[error("Training failure in {algorithm}: {message}")]
    Training { algorithm: String, message: String },

    #[error("Artifact corruption: {0}")]
    ArtifactCorruption(String),
}
