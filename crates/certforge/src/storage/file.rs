use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::StorageGateway;
use crate::error::StorageError;

/// Filesystem-backed storage: one directory per bucket
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage rooted at the given base path
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn blob_path(&self, bucket: &str, name: &str) -> Result<PathBuf, StorageError> {
        // names are flat; anything path-like would escape the bucket
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.base_path.join(bucket).join(name))
    }
}

#[async_trait]
impl StorageGateway for FileStorage {
    async fn save(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.blob_path(bucket, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Backend(format!("Failed to create bucket: {e}")))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to write blob: {e}")))
    }

    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.blob_path(bucket, name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(StorageError::Backend(format!("Failed to read blob: {e}"))),
        }
    }

    async fn exists(&self, bucket: &str, name: &str) -> Result<bool, StorageError> {
        let path = self.blob_path(bucket, name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), StorageError> {
        let path = self.blob_path(bucket, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(format!("Failed to delete blob: {e}"))),
        }
    }
}
