use crate::error::StorageError;
use std::path::PathBuf;

/// Byte storage addressed by opaque URL. Dataset bytes and serialized
/// model artifacts both live behind this boundary; the engine never
/// interprets the URL beyond resolving it to a local path.
///
/// `file://` URLs and bare paths are supported.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }

    pub async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(Self::resolve(url))
            .await
            .map_err(|source| StorageError::Blob { url: url.to_string(), source })
    }

    pub async fn put(&self, url: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = Self::resolve(url);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StorageError::Blob { url: url.to_string(), source })?;
            }
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Blob { url: url.to_string(), source })
    }
}
