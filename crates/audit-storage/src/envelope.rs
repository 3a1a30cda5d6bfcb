//! Event envelope metadata
//!
//! Events arrive as JSON documents whose top level carries a few descriptive
//! fields next to an arbitrary payload:
//!
//! ```json
//! {"type": "main", "source": "http://65.21.235.219:9999", "dataType": "BlockAdded", "id": 65027303, "data": {}}
//! ```
//!
//! Only the known fields are read. Everything else, including the payload,
//! is skipped without being materialized, so producers may add fields
//! without breaking ingestion.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::EnvelopeError;

/// The event's own identifier, as carried in its envelope
///
/// Never used to look a stored event up; see [`StorageId`](crate::StorageId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(i64);

impl DomainId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive metadata read from an event envelope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventEnvelope {
    /// Stream the event came from (main, deploys, sigs)
    #[serde(rename = "type")]
    event_type: String,
    /// URL of the node that emitted the event
    source: String,
    /// Kind of payload, e.g. BlockAdded
    #[serde(rename = "dataType")]
    data_type: String,
    /// Numeric strings are accepted; anything else counts as absent
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<DomainId>,
    /// Node version, only sent by newer producers
    #[serde(default, deserialize_with = "lenient_version")]
    version: Option<String>,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl EventEnvelope {
    /// Read the envelope fields from raw event bytes
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a JSON object, or if `type`, `source` or
    /// `dataType` is missing, null or not a string. A malformed `id` or
    /// `version` never fails the parse.
    pub fn parse(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        // Derived struct deserialization also accepts arrays; envelopes must be objects
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => {}
            Some(_) => return Err(EnvelopeError::NotAnObject),
            None => return Err(EnvelopeError::Syntax("empty input".into())),
        }

        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn id(&self) -> Option<DomainId> {
        self.id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DomainId>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().map(DomainId),
        Value::String(s) => s.trim().parse().ok().map(DomainId),
        _ => None,
    })
}

fn lenient_version<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}
