use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob I/O error for '{url}': {source}")]
    Blob {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Illegal status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
