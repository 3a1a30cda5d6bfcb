//! Event audit service
//!
//! Ties envelope extraction, the filename policy and a [`BlobStore`] together.
//! Saving buffers the whole event once: the same bytes are parsed for
//! metadata and handed to the store untouched. Reading is a passthrough to
//! the store's stream.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::BlobStore;
use crate::blobs::{BlobMetadata, BlobRecord, EventStream, JSON_CONTENT_TYPE};
use crate::envelope::EventEnvelope;
use crate::error::{AuditError, StorageError};
use crate::ids::StorageId;

/// Default upper bound on a single event (16 MiB)
pub const DEFAULT_MAX_EVENT_SIZE: usize = 16 * 1024 * 1024;

const JSON_EXTENSION: &str = ".json";

/// Stores events with their envelope metadata and serves them back by storage id
#[derive(Clone)]
pub struct EventAuditService {
    store: Arc<dyn BlobStore>,
    max_event_size: usize,
}

impl EventAuditService {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            max_event_size: DEFAULT_MAX_EVENT_SIZE,
        }
    }

    /// Reject events larger than `limit` bytes
    pub fn with_max_event_size(mut self, limit: usize) -> Self {
        self.max_event_size = limit;
        self
    }

    pub fn max_event_size(&self) -> usize {
        self.max_event_size
    }

    /// Save an event read from `reader`
    ///
    /// The input is read to the end before anything else happens. Returns the
    /// id the store assigned, which is the only key the event can be read
    /// back with.
    pub async fn save<R>(&self, reader: R) -> Result<StorageId, AuditError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut buf = Vec::new();
        reader
            .take((self.max_event_size as u64).saturating_add(1))
            .read_to_end(&mut buf)
            .await
            .map_err(StorageError::from)?;

        self.save_bytes(Bytes::from(buf)).await
    }

    /// Save an event that is already in memory
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn save_bytes(&self, data: Bytes) -> Result<StorageId, AuditError> {
        if data.len() > self.max_event_size {
            return Err(AuditError::PayloadTooLarge {
                size: data.len(),
                limit: self.max_event_size,
            });
        }

        let envelope = EventEnvelope::parse(&data)?;
        debug!(?envelope, "Saving event");

        let metadata = BlobMetadata::from_envelope(&envelope, data.len() as u64);
        let filename = filename_for(&envelope);

        let id = self
            .store
            .store(data, &filename, JSON_CONTENT_TYPE, metadata)
            .await?;

        debug!(id = %id, filename = %filename, "Saved event");
        Ok(id)
    }

    /// Open a stored event for reading
    ///
    /// Fails with [`AuditError::NotFound`] if nothing is stored under `id` or
    /// its content has gone missing.
    pub async fn read(&self, id: &str) -> Result<EventStream, AuditError> {
        debug!(id, "Reading event");
        let storage_id = parse_storage_id(id)?;
        Ok(self.store.open(&storage_id).await?)
    }

    /// Registration details (filename, metadata, length) of a stored event
    pub async fn describe(&self, id: &str) -> Result<BlobRecord, AuditError> {
        let storage_id = parse_storage_id(id)?;
        self.store
            .find(&storage_id)
            .await?
            .ok_or_else(|| AuditError::NotFound(id.to_string()))
    }
}

/// Filename an event is stored under
///
/// `<id>.json` when the envelope carries a domain id, otherwise
/// `_<uuid>.json`. Informational only; lookups never use it.
pub fn filename_for(envelope: &EventEnvelope) -> String {
    match envelope.id() {
        Some(id) => format!("{id}{JSON_EXTENSION}"),
        None => format!("_{}{JSON_EXTENSION}", Uuid::new_v4()),
    }
}

// An id that cannot have been issued is simply unknown
fn parse_storage_id(id: &str) -> Result<StorageId, AuditError> {
    StorageId::parse(id).ok_or_else(|| AuditError::NotFound(id.to_string()))
}
