//! Archive assembly: bundle many stored documents into one zip.

use std::io::{Cursor, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use certforge::{StorageGateway, bucket};

use crate::error::Result;

// Moderate deflate level: the entries are already-compressed PDFs, so
// higher levels buy almost nothing for noticeably more CPU.
const COMPRESSION_LEVEL: i64 = 6;

/// One file to copy into the archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Name of the file inside the archive
    pub name: String,
    /// Bucket holding the source blob
    pub bucket: String,
    /// Source blob name
    pub source: String,
}

/// Location of a finished archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub bucket: String,
    pub name: String,
}

/// Packages named blobs into one compressed container
pub struct Archiver {
    storage: Arc<dyn StorageGateway>,
}

impl Archiver {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        Self { storage }
    }

    /// Copy every entry into a zip and store it under `destination` in
    /// the archives bucket. The container is built fully in memory and
    /// written with a single `save`, so the destination either holds the
    /// complete archive or nothing.
    pub async fn archive(&self, entries: &[ArchiveEntry], destination: &str) -> Result<ArchiveRef> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(COMPRESSION_LEVEL))
                .unix_permissions(0o644);

            for entry in entries {
                let data = self.storage.get(&entry.bucket, &entry.source).await?;
                writer.start_file(entry.name.as_str(), options)?;
                writer.write_all(&data)?;
            }
            writer.finish()?;
        }

        let bytes = cursor.into_inner();
        debug!(
            entries = entries.len(),
            size = bytes.len(),
            destination,
            "archive assembled"
        );
        self.storage
            .save(bucket::ARCHIVES, destination, bytes)
            .await?;

        Ok(ArchiveRef {
            bucket: bucket::ARCHIVES.to_string(),
            name: destination.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certforge::MemoryStorage;

    #[tokio::test]
    async fn archives_entries_in_order() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .save(bucket::DOCUMENTS, "a.pdf", b"first".to_vec())
            .await
            .unwrap();
        storage
            .save(bucket::DOCUMENTS, "b.pdf", b"second".to_vec())
            .await
            .unwrap();

        let entries = vec![
            ArchiveEntry {
                name: "a.pdf".into(),
                bucket: bucket::DOCUMENTS.into(),
                source: "a.pdf".into(),
            },
            ArchiveEntry {
                name: "b.pdf".into(),
                bucket: bucket::DOCUMENTS.into(),
                source: "b.pdf".into(),
            },
        ];

        let archiver = Archiver::new(storage.clone());
        let archive_ref = archiver.archive(&entries, "run.zip").await.unwrap();
        assert_eq!(archive_ref.bucket, bucket::ARCHIVES);

        let bytes = storage.get(bucket::ARCHIVES, "run.zip").await.unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        assert_eq!(zip.by_index(0).unwrap().name(), "a.pdf");
        assert_eq!(zip.by_index(1).unwrap().name(), "b.pdf");
    }

    #[tokio::test]
    async fn missing_source_blob_fails_the_archive() {
        let storage = Arc::new(MemoryStorage::new());
        let archiver = Archiver::new(storage.clone());

        let entries = vec![ArchiveEntry {
            name: "gone.pdf".into(),
            bucket: bucket::DOCUMENTS.into(),
            source: "gone.pdf".into(),
        }];

        assert!(archiver.archive(&entries, "run.zip").await.is_err());
        // nothing half-written under the destination name
        assert!(!storage.exists(bucket::ARCHIVES, "run.zip").await.unwrap());
    }
}
