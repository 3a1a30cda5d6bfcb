//! Blob registration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::{DomainId, EventEnvelope};
use crate::ids::StorageId;

/// Content type every audited event is stored under
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Metadata map attached to a stored event
///
/// Serializes as `{type, dataType, source, bytes, id?}`; `id` is left out
/// entirely when the event had none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub source: String,
    /// Payload length in bytes
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DomainId>,
}

impl BlobMetadata {
    /// Build the metadata map for an event of `bytes` length
    pub fn from_envelope(envelope: &EventEnvelope, bytes: u64) -> Self {
        Self {
            event_type: envelope.event_type().to_string(),
            data_type: envelope.data_type().to_string(),
            source: envelope.source().to_string(),
            bytes,
            id: envelope.id(),
        }
    }

    /// The metadata as a JSON object
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Everything a store registers for one blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRecord {
    pub id: StorageId,
    pub filename: String,
    pub content_type: String,
    /// Payload length in bytes
    pub length: u64,
    /// BLAKE3 digest of the payload, hex encoded
    pub checksum: String,
    pub stored_at: DateTime<Utc>,
    pub metadata: BlobMetadata,
}

impl BlobRecord {
    /// Create the registration for `data` stored under `id`
    pub fn new(
        id: StorageId,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: &[u8],
        metadata: BlobMetadata,
    ) -> Self {
        Self {
            id,
            filename: filename.into(),
            content_type: content_type.into(),
            length: data.len() as u64,
            checksum: checksum(data),
            stored_at: Utc::now(),
            metadata,
        }
    }

    /// Check `data` against the recorded length and checksum
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() as u64 == self.length && checksum(data) == self.checksum
    }
}

fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
