//! redb registration index
//!
//! One table maps raw storage id bytes to the JSON-encoded [`BlobRecord`].
//! A blob only becomes visible once its row is committed here.

use std::path::Path;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::{debug, info, instrument};

use super::record::BlobRecord;
use crate::error::StorageError;
use crate::ids::StorageId;

// Key: storage id bytes, Value: JSON-encoded BlobRecord
const BLOBS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blobs");

/// Registration index backed by redb
pub struct BlobIndex {
    db: Database,
}

impl BlobIndex {
    /// Open or create the index database
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(StorageError::database)?;
        let index = Self { db };
        index.init_tables()?;

        info!("Opened blob index");
        Ok(index)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(StorageError::database)?;
        write_txn.open_table(BLOBS).map_err(StorageError::database)?;
        write_txn.commit().map_err(StorageError::database)?;

        debug!("Initialized blob index tables");
        Ok(())
    }

    /// Register a blob; an id is never registered twice
    pub fn register(&self, record: &BlobRecord) -> Result<(), StorageError> {
        let key = record.id.as_bytes().as_slice();
        let value =
            serde_json::to_vec(record).map_err(|e| StorageError::serialization(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(StorageError::database)?;
        {
            let mut table = write_txn.open_table(BLOBS).map_err(StorageError::database)?;
            let taken = table.get(key).map_err(StorageError::database)?.is_some();
            if taken {
                return Err(StorageError::Database(format!(
                    "storage id {} already registered",
                    record.id
                )));
            }
            table.insert(key, value.as_slice()).map_err(StorageError::database)?;
        }
        write_txn.commit().map_err(StorageError::database)?;

        Ok(())
    }

    /// Look up the registration for `id`
    pub fn lookup(&self, id: &StorageId) -> Result<Option<BlobRecord>, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::database)?;
        let table = read_txn.open_table(BLOBS).map_err(StorageError::database)?;

        let Some(value) = table
            .get(id.as_bytes().as_slice())
            .map_err(StorageError::database)?
        else {
            return Ok(None);
        };

        let record = serde_json::from_slice(value.value())
            .map_err(|e| StorageError::deserialization(e.to_string()))?;
        Ok(Some(record))
    }

    /// Number of registered blobs
    pub fn len(&self) -> Result<u64, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::database)?;
        let table = read_txn.open_table(BLOBS).map_err(StorageError::database)?;
        table.len().map_err(StorageError::database)
    }

    /// Check if no blob is registered
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
