//! Blob storage
//!
//! File-based payload storage with a redb registration index, plus the
//! record and stream types shared by every [`BlobStore`](crate::BlobStore)
//! implementation.

mod index;
mod record;
mod store;
mod stream;

pub use index::BlobIndex;
pub use record::{BlobMetadata, BlobRecord, JSON_CONTENT_TYPE};
pub use store::{BlobStoreConfig, PersistentBlobStore};
pub use stream::EventStream;
