pub mod blob;
pub mod error;
pub mod repository;

pub use blob::BlobStore;
pub use error::StorageError;
pub use repository::{BakeoffRow, RunRepository, ScoringRunRow, UpsertOutcome};
