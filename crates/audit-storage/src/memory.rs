//! In-memory blob store
//!
//! Suitable for testing and simulation environments.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;

use crate::BlobStore;
use crate::blobs::{BlobMetadata, BlobRecord, EventStream};
use crate::error::StorageError;
use crate::ids::StorageId;

/// In-memory implementation of BlobStore
///
/// Registrations and payloads are kept in separate `DashMap`s so a lost
/// payload behind a live registration can be simulated with
/// [`discard_content`](Self::discard_content).
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    records: DashMap<StorageId, BlobRecord>,
    contents: DashMap<StorageId, Bytes>,
}

impl InMemoryBlobStore {
    /// Create a new in-memory blob store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered blobs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no blob is registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop a blob's payload but keep its registration
    pub fn discard_content(&self, id: &StorageId) -> bool {
        self.contents.remove(id).is_some()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<StorageId, StorageError> {
        let id = StorageId::generate();
        let record = BlobRecord::new(id, filename, content_type, &data, metadata);

        // Payload first; the registration is what makes the blob visible
        self.contents.insert(id, data);
        self.records.insert(id, record);

        trace!(id = %id, filename, "Stored blob in memory");
        Ok(id)
    }

    async fn open(&self, id: &StorageId) -> Result<EventStream, StorageError> {
        let length = self
            .records
            .get(id)
            .map(|record| record.length)
            .ok_or_else(|| StorageError::not_found(id.to_string()))?;

        let data = self
            .contents
            .get(id)
            .map(|content| content.value().clone())
            .ok_or_else(|| StorageError::not_found(format!("{id} (content missing)")))?;

        Ok(EventStream::new(std::io::Cursor::new(data), length))
    }

    async fn find(&self, id: &StorageId) -> Result<Option<BlobRecord>, StorageError> {
        Ok(self.records.get(id).map(|record| record.value().clone()))
    }
}
