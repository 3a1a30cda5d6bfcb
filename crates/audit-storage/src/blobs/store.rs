//! Persistent blob store
//!
//! Payloads live as plain files in a sharded directory tree; registrations
//! live in a redb index. A payload file is written and synced before its
//! registration is committed, so a blob is either fully visible or not at all.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use super::index::BlobIndex;
use super::record::{BlobMetadata, BlobRecord};
use super::stream::EventStream;
use crate::BlobStore;
use crate::error::StorageError;
use crate::ids::StorageId;

/// Configuration for the persistent blob store
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    /// Base directory for payload files
    pub base_dir: PathBuf,
    /// Path of the redb registration index
    pub index_path: PathBuf,
    /// Number of subdirectory levels (for sharding)
    pub shard_depth: u8,
    /// Maximum blob size (bytes)
    pub max_blob_size: u64,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self::in_dir("./data")
    }
}

impl BlobStoreConfig {
    /// Keep payloads and index together under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            base_dir: dir.join("events"),
            index_path: dir.join("events.redb"),
            shard_depth: 2,                   // e.g. 67/45/...234567.json
            max_blob_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// File-backed blob store with a redb registration index
pub struct PersistentBlobStore {
    config: BlobStoreConfig,
    index: Arc<BlobIndex>,
}

impl PersistentBlobStore {
    /// Open the store, creating directories and the index as needed
    pub async fn new(config: BlobStoreConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.base_dir).await?;

        let index_path = config.index_path.clone();
        let index = tokio::task::spawn_blocking(move || BlobIndex::open(&index_path))
            .await
            .map_err(|e| StorageError::Io(e.to_string()))??;

        info!(path = %config.base_dir.display(), "Blob store initialized");

        Ok(Self {
            config,
            index: Arc::new(index),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &BlobStoreConfig {
        &self.config
    }

    /// Number of registered blobs
    pub async fn len(&self) -> Result<u64, StorageError> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.len())
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?
    }

    /// Check if no blob is registered
    pub async fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len().await? == 0)
    }

    /// Re-read a payload and compare it with its registration
    ///
    /// Returns `false` (and logs a warning) if the content no longer matches.
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn verify(&self, id: &StorageId) -> Result<bool, StorageError> {
        let record = self.registration(id).await?;
        let data = fs::read(self.blob_path(id)).await.map_err(|e| content_error(id, e))?;

        let intact = record.matches(&data);
        if !intact {
            warn!(
                expected = %record.checksum,
                actual_len = data.len(),
                "Blob checksum mismatch"
            );
        }
        Ok(intact)
    }

    /// Get the file path for a storage id
    ///
    /// Shard directories come from the trailing hex pairs, which are the
    /// counter and random bytes; the leading pairs are the creation time and
    /// would put a whole second's worth of events into one directory.
    pub fn blob_path(&self, id: &StorageId) -> PathBuf {
        let hex = id.to_hex();
        let mut path = self.config.base_dir.clone();

        let depth = (self.config.shard_depth as usize).min(StorageId::LEN);
        for i in 0..depth {
            let end = hex.len() - i * 2;
            path.push(&hex[end - 2..end]);
        }

        path.push(format!("{hex}.json"));
        path
    }

    async fn lookup(&self, id: &StorageId) -> Result<Option<BlobRecord>, StorageError> {
        let index = Arc::clone(&self.index);
        let id = *id;
        tokio::task::spawn_blocking(move || index.lookup(&id))
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?
    }

    async fn registration(&self, id: &StorageId) -> Result<BlobRecord, StorageError> {
        self.lookup(id)
            .await?
            .ok_or_else(|| StorageError::not_found(id.to_string()))
    }

    async fn write_payload(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("tmp");

        if let Err(e) = write_then_rename(&temp_path, path, data).await {
            match fs::remove_file(&temp_path).await {
                Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                    warn!(error = %cleanup, path = %temp_path.display(), "Failed to remove temp payload");
                }
                _ => {}
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Write `data` under a caller-chosen id
    ///
    /// Nothing stays on disk if registration fails.
    #[instrument(skip(self, id, data, metadata), fields(id = %id, size = data.len()))]
    async fn store_as(
        &self,
        id: StorageId,
        data: Bytes,
        filename: &str,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<StorageId, StorageError> {
        if data.len() as u64 > self.config.max_blob_size {
            return Err(StorageError::CapacityExceeded);
        }

        let path = self.blob_path(&id);
        self.write_payload(&path, &data).await?;

        let record = BlobRecord::new(id, filename, content_type, &data, metadata);
        let index = Arc::clone(&self.index);
        let registered = tokio::task::spawn_blocking(move || index.register(&record))
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
            .and_then(|result| result);

        if let Err(e) = registered {
            // Unregistered payloads are never served; don't leave them behind either
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!(error = %cleanup, path = %path.display(), "Failed to remove orphaned payload");
            }
            return Err(e);
        }

        debug!(filename, "Stored blob");
        Ok(id)
    }
}

async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(temp_path, path).await
}

#[async_trait]
impl BlobStore for PersistentBlobStore {
    async fn store(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<StorageId, StorageError> {
        self.store_as(StorageId::generate(), data, filename, content_type, metadata)
            .await
    }

    #[instrument(skip(self, id), fields(id = %id))]
    async fn open(&self, id: &StorageId) -> Result<EventStream, StorageError> {
        let record = self.registration(id).await?;

        let file = File::open(self.blob_path(id))
            .await
            .map_err(|e| content_error(id, e))?;

        let actual = file.metadata().await?.len();
        if actual < record.length {
            return Err(StorageError::corrupted(format!(
                "{id}: expected {} bytes, found {actual}",
                record.length
            )));
        }

        Ok(EventStream::new(file.take(record.length), record.length))
    }

    async fn find(&self, id: &StorageId) -> Result<Option<BlobRecord>, StorageError> {
        self.lookup(id).await
    }
}

fn content_error(id: &StorageId, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::not_found(format!("{id} (content missing)"))
    } else {
        StorageError::Io(err.to_string())
    }
}
