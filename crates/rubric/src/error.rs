use thiserror::Error;

#[derive(Error, Debug)]
pub enum RubricError {
    #[error("No candidates to rank")]
    NoCandidates,

    #[error("Invalid rubric config: {0}")]
    InvalidConfig(String),
}
