//! End-to-end tests for the audit service over the persistent store
//!
//! These tests exercise the full save/read path against real files and a
//! redb index in a temporary directory, including concurrent access.

use std::sync::Arc;

use audit_storage::{
    AuditError, BlobStore, BlobStoreConfig, DomainId, EventAuditService, EventEnvelope,
    PersistentBlobStore, StorageId,
};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

const MAIN_EVENT: &[u8] = include_bytes!("fixtures/kafka-events-main.json");

async fn create_service() -> (EventAuditService, Arc<PersistentBlobStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(
        PersistentBlobStore::new(BlobStoreConfig::in_dir(temp_dir.path()))
            .await
            .unwrap(),
    );
    let service = EventAuditService::new(store.clone());
    (service, store, temp_dir)
}

// ============================================================================
// Save / read
// ============================================================================

#[tokio::test]
async fn test_save_event_records_metadata() {
    let (service, store, _temp) = create_service().await;

    let id = service.save(MAIN_EVENT).await.unwrap();

    let record = store.find(&id).await.unwrap().expect("event should be registered");
    assert_eq!(record.filename, "65027303.json");
    assert_eq!(record.content_type, "application/json");

    let metadata = record.metadata.to_map();
    assert_eq!(metadata["source"], "http://65.21.235.219:9999");
    assert_eq!(metadata["type"], "main");
    assert_eq!(metadata["dataType"], "BlockAdded");
    assert_eq!(metadata["id"].as_i64(), Some(65027303));
    assert_eq!(metadata["bytes"].as_u64(), Some(1163));
}

#[tokio::test]
async fn test_read_event_is_bit_identical() {
    let (service, _store, _temp) = create_service().await;

    let id = service.save(MAIN_EVENT).await.unwrap();

    let mut stream = service.read(&id.to_string()).await.unwrap();
    assert_eq!(stream.length(), 1163);

    let mut read_bytes = Vec::new();
    stream.read_to_end(&mut read_bytes).await.unwrap();
    assert_eq!(read_bytes.len() as u64, 1163);
    assert_eq!(read_bytes, MAIN_EVENT);

    // The stored bytes still carry the envelope
    let envelope = EventEnvelope::parse(&read_bytes).unwrap();
    assert_eq!(envelope.id(), Some(DomainId::new(65027303)));
    assert_eq!(envelope.source(), "http://65.21.235.219:9999");
    assert_eq!(envelope.event_type(), "main");
    assert_eq!(envelope.data_type(), "BlockAdded");
}

#[tokio::test]
async fn test_stored_bytes_are_not_reformatted() {
    let (service, store, _temp) = create_service().await;

    // Odd spacing and key order must survive untouched
    let event = b"  {\"dataType\" :\"Step\",\n\"source\":\"http://n\",  \"type\":\"main\"}\r\n";
    let id = service.save(&event[..]).await.unwrap();

    let data = service.read(&id.to_string()).await.unwrap().into_bytes().await.unwrap();
    assert_eq!(&data[..], &event[..]);
    assert!(store.verify(&id).await.unwrap());
}

#[tokio::test]
async fn test_rejected_event_leaves_store_empty() {
    let (service, store, _temp) = create_service().await;

    let err = service
        .save(&br#"{"type":"main","dataType":"BlockAdded","id":1}"#[..])
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::MalformedEnvelope(_)));
    assert!(store.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_read_unknown_ids() {
    let (service, _store, _temp) = create_service().await;

    for id in ["does-not-exist", "", &StorageId::generate().to_string()] {
        let err = service.read(id).await.unwrap_err();
        assert!(matches!(err, AuditError::NotFound(_)), "{id:?}: {err:?}");
    }
}

#[tokio::test]
async fn test_read_with_missing_payload_file() {
    let (service, store, _temp) = create_service().await;

    let id = service.save(MAIN_EVENT).await.unwrap();
    tokio::fs::remove_file(store.blob_path(&id)).await.unwrap();

    let err = service.read(&id.to_string()).await.unwrap_err();
    assert!(matches!(err, AuditError::NotFound(_)));
}

#[tokio::test]
async fn test_events_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = BlobStoreConfig::in_dir(temp_dir.path());

    let id = {
        let store = PersistentBlobStore::new(config.clone()).await.unwrap();
        EventAuditService::new(Arc::new(store)).save(MAIN_EVENT).await.unwrap()
    };

    let store = PersistentBlobStore::new(config).await.unwrap();
    let service = EventAuditService::new(Arc::new(store));

    let data = service.read(&id.to_string()).await.unwrap().into_bytes().await.unwrap();
    assert_eq!(&data[..], MAIN_EVENT);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Concurrent saves never interact: every save gets its own id and blob
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves() {
    let (service, store, _temp) = create_service().await;
    let task_count = 32;

    let handles: Vec<_> = (0..task_count)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let event = format!(
                    r#"{{"type":"deploys","source":"http://node","dataType":"DeployAccepted","id":{i}}}"#
                );
                let id = service.save(event.as_bytes()).await.unwrap();
                (id, event)
            })
        })
        .collect();

    let mut saved = Vec::new();
    for handle in handles {
        saved.push(handle.await.unwrap());
    }

    let mut ids: Vec<StorageId> = saved.iter().map(|(id, _)| *id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), task_count);
    assert_eq!(store.len().await.unwrap(), task_count as u64);

    for (id, event) in saved {
        let data = service.read(&id.to_string()).await.unwrap().into_bytes().await.unwrap();
        assert_eq!(&data[..], event.as_bytes());
    }
}

/// Concurrent reads of one id each get their own complete stream
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_of_same_id() {
    let (service, _store, _temp) = create_service().await;
    let id = service.save(MAIN_EVENT).await.unwrap().to_string();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            let id = id.clone();
            tokio::spawn(async move {
                service.read(&id).await.unwrap().into_bytes().await.unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(&handle.await.unwrap()[..], MAIN_EVENT);
    }
}
