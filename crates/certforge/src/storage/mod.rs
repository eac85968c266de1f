//! Blob storage abstraction.
//!
//! The core addresses every byte blob by logical bucket plus filename;
//! what the buckets map to (directories, object-store prefixes, rows)
//! is the backend's business.

#[cfg(feature = "fs")]
mod file;
#[cfg(feature = "fs")]
pub use file::FileStorage;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;

/// Logical bucket names used by the core
pub mod bucket {
    /// Uploaded base documents
    pub const TEMPLATES: &str = "templates";
    /// Signature and other image assets
    pub const ASSETS: &str = "assets";
    /// Rendered certificates
    pub const DOCUMENTS: &str = "documents";
    /// Bulk-run archives
    pub const ARCHIVES: &str = "archives";
}

/// Abstraction over blob storage backends
#[async_trait]
pub trait StorageGateway: Send + Sync + 'static {
    /// Store a blob under `bucket`/`name`
    async fn save(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// Retrieve a blob
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether a blob exists
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool, StorageError>;

    /// Delete a blob
    async fn delete(&self, bucket: &str, name: &str) -> Result<(), StorageError>;
}

/// In-memory storage implementation for tests and development
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored `(bucket, name)` keys, useful in tests
    pub fn keys(&self) -> Vec<(String, String)> {
        self.data.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn save(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        storage.insert((bucket.to_string(), name.to_string()), data);
        Ok(())
    }

    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        storage
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }

    async fn exists(&self, bucket: &str, name: &str) -> Result<bool, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        Ok(storage.contains_key(&(bucket.to_string(), name.to_string())))
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), StorageError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        storage.remove(&(bucket.to_string(), name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_basic_operations() {
        let storage = MemoryStorage::new();
        let data = b"certificate bytes".to_vec();

        storage
            .save(bucket::DOCUMENTS, "cert.pdf", data.clone())
            .await
            .unwrap();
        let retrieved = storage.get(bucket::DOCUMENTS, "cert.pdf").await.unwrap();
        assert_eq!(data, retrieved);

        assert!(storage.exists(bucket::DOCUMENTS, "cert.pdf").await.unwrap());
        assert!(!storage.exists(bucket::ASSETS, "cert.pdf").await.unwrap());

        storage.delete(bucket::DOCUMENTS, "cert.pdf").await.unwrap();
        assert!(!storage.exists(bucket::DOCUMENTS, "cert.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn memory_storage_not_found() {
        let storage = MemoryStorage::new();
        match storage.get(bucket::ASSETS, "missing.png").await {
            Err(StorageError::NotFound { bucket, name }) => {
                assert_eq!(bucket, "assets");
                assert_eq!(name, "missing.png");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn buckets_do_not_collide() {
        let storage = MemoryStorage::new();
        storage
            .save(bucket::TEMPLATES, "a", b"template".to_vec())
            .await
            .unwrap();
        storage
            .save(bucket::DOCUMENTS, "a", b"document".to_vec())
            .await
            .unwrap();

        assert_eq!(storage.get(bucket::TEMPLATES, "a").await.unwrap(), b"template");
        assert_eq!(storage.get(bucket::DOCUMENTS, "a").await.unwrap(), b"document");
        assert_eq!(storage.len(), 2);
    }
}
