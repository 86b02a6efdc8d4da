use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Row has {row} values but the model expects {expected}")]
    RowWidthMismatch { row: usize, expected: usize },

    #[error("Reason-code pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}
