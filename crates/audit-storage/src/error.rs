//! Error types for audit-storage
//!
//! Three layers of failure are kept apart:
//!
//! - [`EnvelopeError`]: the event bytes could not be read as an envelope
//! - [`StorageError`]: a blob store adapter failed
//! - [`AuditError`]: what [`EventAuditService`](crate::EventAuditService) reports to its caller

use serde_json::error::Category;
use thiserror::Error;

/// Errors that can occur in blob store operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested blob or its content was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob is larger than the store accepts
    #[error("Storage capacity exceeded")]
    CapacityExceeded,

    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Stored content no longer matches its registration
    #[error("Corrupted blob: {0}")]
    Corrupted(String),

    /// Registration index error
    #[error("Database error: {0}")]
    Database(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new NotFound error
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::NotFound(item.into())
    }

    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a new Corrupted error
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Create a new Database error from any redb error
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Errors raised while extracting metadata from an event envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The top-level JSON value is not an object
    #[error("event envelope must be a JSON object")]
    NotAnObject,

    /// The bytes are not well-formed JSON
    #[error("event is not valid JSON: {0}")]
    Syntax(String),

    /// A recognized field is missing, null or of the wrong type
    #[error("invalid event envelope: {0}")]
    Field(String),
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => EnvelopeError::Field(err.to_string()),
            Category::Syntax | Category::Eof | Category::Io => {
                EnvelopeError::Syntax(err.to_string())
            }
        }
    }
}

/// Errors reported by the event audit service
#[derive(Debug, Error)]
pub enum AuditError {
    /// The event envelope lacks a required field or is not parseable; nothing was stored
    #[error("Malformed event envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),

    /// No event is stored under the given id, or its content is gone
    #[error("Unable to find event with id {0}")]
    NotFound(String),

    /// The event is larger than the service accepts; nothing was stored
    #[error("Event of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The backing store failed
    #[error("Storage failure: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for AuditError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(item) => AuditError::NotFound(item),
            other => AuditError::Storage(other),
        }
    }
}

impl AuditError {
    /// Whether the failure was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuditError::Storage(_))
    }
}
