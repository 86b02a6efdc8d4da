use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Score and label vectors have different lengths ({scores} vs {labels})")]
    LengthMismatch { scores: usize, labels: usize },
}
