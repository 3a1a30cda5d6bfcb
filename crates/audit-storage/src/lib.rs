//! # Audit Storage
//!
//! Write-once storage for JSON events.
//!
//! Each saved event is kept byte-for-byte as received, together with a small
//! metadata map taken from its envelope (`type`, `dataType`, `source`, `id`).
//! Events are read back by the opaque [`StorageId`] the store assigned at
//! save time; there is no update and no other lookup.
//!
//! ## Features
//!
//! - **EventEnvelope**: tolerant extraction of the envelope fields
//! - **BlobStore trait**: store-by-bytes and open-by-id with a length-known stream
//! - **InMemoryBlobStore**: in-memory implementation for testing/simulation
//! - **PersistentBlobStore**: payload files plus a redb registration index
//! - **EventAuditService**: the save/read orchestration on top of any store
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use audit_storage::{EventAuditService, InMemoryBlobStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = EventAuditService::new(Arc::new(InMemoryBlobStore::new()));
//!
//!     let event = br#"{"type":"main","source":"http://node:9999","dataType":"BlockAdded","id":7}"#;
//!     let id = service.save(&event[..]).await.unwrap();
//!
//!     let stream = service.read(&id.to_string()).await.unwrap();
//!     assert_eq!(stream.length(), event.len() as u64);
//! }
//! ```

pub mod blobs;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod memory;
pub mod service;

// Re-exports
pub use blobs::{
    BlobMetadata, BlobRecord, BlobStoreConfig, EventStream, JSON_CONTENT_TYPE,
    PersistentBlobStore,
};
pub use envelope::{DomainId, EventEnvelope};
pub use error::{AuditError, EnvelopeError, StorageError};
pub use ids::StorageId;
pub use memory::InMemoryBlobStore;
pub use service::{DEFAULT_MAX_EVENT_SIZE, EventAuditService, filename_for};

use async_trait::async_trait;
use bytes::Bytes;

/// Trait for persisting immutable blobs with attached metadata
///
/// Implementations assign the [`StorageId`]; callers never choose it. A blob
/// is visible under its id only once both payload and registration are in
/// place, and it is never modified afterwards.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `data` exactly as given
    ///
    /// # Arguments
    ///
    /// * `data` - The payload; stored without re-encoding
    /// * `filename` - Informational name recorded with the blob
    /// * `content_type` - Content type tag recorded with the blob
    /// * `metadata` - Metadata map recorded with the blob
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds the store's capacity or an
    /// I/O error occurs. On error nothing is visible.
    async fn store(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<StorageId, StorageError>;

    /// Open a stored blob for reading
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no blob is registered under `id`,
    /// and also if it is registered but its payload is gone.
    async fn open(&self, id: &StorageId) -> Result<EventStream, StorageError>;

    /// Get the registration of a blob, if any
    async fn find(&self, id: &StorageId) -> Result<Option<BlobRecord>, StorageError>;
}
