use crate::error::DatasetError;
use core_types::DatasetFormat;
use std::collections::HashMap;

pub mod error;
pub mod reader;
pub mod schema;

pub use schema::{detect_label_column, infer_schema, Schema};

/// A dataset parsed into headers plus per-row string maps. Values are
/// preserved exactly as they appeared in the source bytes; typing is the
/// schema layer's job.
#[derive(Debug, Clone)]
pub struct ParsedDataset {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl ParsedDataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Case-insensitive header lookup, returning the canonical header.
    pub fn find_header(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.headers
            .iter()
            .find(|h| h.to_lowercase() == lowered)
            .map(|h| h.as_str())
    }
}

/// Parses raw dataset bytes in the declared format. The first row is
/// always treated as headers.
pub fn parse_bytes(bytes: &[u8], format: DatasetFormat) -> Result<ParsedDataset, DatasetError> {
    let parsed = match format {
        DatasetFormat::Csv => reader::parse_csv(bytes)?,
        DatasetFormat::Xlsx => reader::parse_xlsx(bytes)?,
    };
    if parsed.headers.is_empty() {
        return Err(DatasetError::MissingHeaders);
    }
    if parsed.rows.is_empty() {
        return Err(DatasetError::Empty);
    }
    tracing::debug!(
        rows = parsed.rows.len(),
        columns = parsed.headers.len(),
        "parsed dataset"
    );
    Ok(parsed)
}
