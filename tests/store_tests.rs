//! Record store behaviour against the in-process backend.

use chrono::{Duration, Utc};
use qrsync::clock::ManualClock;
use qrsync::keys::{KeyHash, derive_key};
use qrsync::models::{Record, RecordId};
use qrsync::store::{BackendError, FetchOutcome, MemoryBackend, RecordStore};
use std::sync::Arc;

fn store_with_clock() -> (RecordStore, MemoryBackend, ManualClock) {
    let backend = MemoryBackend::new();
    let clock = ManualClock::default();
    let store = RecordStore::new(Arc::new(backend.clone())).with_clock(Arc::new(clock.clone()));
    (store, backend, clock)
}

#[tokio::test]
async fn stored_payload_is_found_by_key_and_by_id() {
    let (store, backend, _) = store_with_clock();
    let key = derive_key("1234", "AB").unwrap();

    let id = store
        .store("https://example.com/ticket/42", &key)
        .await
        .expect("store should succeed");

    assert_eq!(id.as_str().len(), 10);
    assert_eq!(
        store.fetch_by_key(&key).await.as_deref(),
        Some("https://example.com/ticket/42")
    );
    assert_eq!(
        store.fetch_by_id(&id, &key).await.as_deref(),
        Some("https://example.com/ticket/42")
    );

    let row = backend.get(&id).await.unwrap();
    assert_eq!(
        row.key_hash.as_str(),
        "e69e47ff59e3115392c8f1fbd7d7c52d58f2980908d4c8b75a67a711dd81a385"
    );
    assert_eq!(row.expires_at - store.now(), Duration::seconds(300));
}

#[tokio::test]
async fn wrong_letters_or_order_do_not_match() {
    let (store, _, _) = store_with_clock();
    let key = derive_key("1234", "AB").unwrap();
    let id = store.store("secret", &key).await.unwrap();

    let swapped = derive_key("1234", "BA").unwrap();
    let other_pin = derive_key("4321", "AB").unwrap();

    assert!(matches!(
        store.lookup_by_key(&swapped).await,
        FetchOutcome::NotFound
    ));
    assert!(store.fetch_by_key(&other_pin).await.is_none());
    assert!(store.fetch_by_id(&id, &swapped).await.is_none());
}

#[tokio::test]
async fn expired_row_is_reported_and_deleted_on_read() {
    let (store, backend, _) = store_with_clock();
    let key = derive_key("0000", "ZZ").unwrap();

    let stale = Record {
        id: RecordId::new("stale00001"),
        payload: "old".to_string(),
        key_hash: key.clone(),
        expires_at: Utc::now() - Duration::seconds(5),
    };
    backend.put(stale.clone()).await;

    assert!(matches!(
        store.lookup_by_key(&key).await,
        FetchOutcome::Expired
    ));
    assert!(backend.get(&stale.id).await.is_none());

    backend.put(stale.clone()).await;
    assert!(store.fetch_by_id(&stale.id, &key).await.is_none());
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn record_expires_once_ttl_has_passed() {
    let (store, backend, clock) = store_with_clock();
    let key = derive_key("5678", "QR").unwrap();
    let id = store.store("short lived", &key).await.unwrap();

    clock.advance(Duration::seconds(299));
    assert!(store.fetch_by_key(&key).await.is_some());

    clock.advance(Duration::seconds(1));
    assert!(matches!(
        store.lookup_by_key(&key).await,
        FetchOutcome::Expired
    ));
    assert!(backend.get(&id).await.is_none());
}

#[tokio::test]
async fn latest_expiry_wins_for_shared_key() {
    let (store, _, clock) = store_with_clock();
    let key = derive_key("1111", "CD").unwrap();

    store.store("first", &key).await.unwrap();
    clock.advance(Duration::seconds(10));
    store.store("second", &key).await.unwrap();

    assert_eq!(store.fetch_by_key(&key).await.as_deref(), Some("second"));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (store, backend, _) = store_with_clock();
    let key = derive_key("1234", "AB").unwrap();
    let id = store.store("to delete", &key).await.unwrap();

    assert!(store.delete_by_id(&id).await);
    assert!(store.delete_by_id(&id).await);
    assert!(store.delete_by_id(&RecordId::new("never0seen")).await);
    assert!(backend.is_empty().await);
    assert!(store.fetch_by_key(&key).await.is_none());
}

#[tokio::test]
async fn concurrent_deletes_both_succeed() {
    let (store, backend, _) = store_with_clock();
    let key = derive_key("2468", "XY").unwrap();
    let id = store.store("race", &key).await.unwrap();

    let (a, b) = tokio::join!(store.delete_by_id(&id), store.delete_by_id(&id));
    assert!(a && b);
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn backend_failures_are_tagged_and_folded() {
    let (store, backend, _) = store_with_clock();
    let key = derive_key("1234", "AB").unwrap();
    let id = store.store("kept", &key).await.unwrap();

    backend.set_offline(true);

    assert!(matches!(
        store.lookup_by_key(&key).await,
        FetchOutcome::Transport(BackendError::Unavailable)
    ));
    assert!(store.fetch_by_key(&key).await.is_none());
    assert!(store.store("more", &key).await.is_none());
    assert!(!store.delete_by_id(&id).await);
    assert!(store.try_sweep_expired().await.is_err());

    backend.set_offline(false);
    assert_eq!(store.fetch_by_key(&key).await.as_deref(), Some("kept"));
}

#[tokio::test]
async fn sweep_removes_only_expired_rows() {
    let (store, backend, clock) = store_with_clock();
    let key = KeyHash::from_digest("sweep");

    store
        .try_store_with_ttl("one minute", &key, Duration::minutes(1))
        .await
        .unwrap();
    let kept = store.store("five minutes", &key).await.unwrap();

    clock.advance(Duration::minutes(2));
    assert_eq!(store.try_sweep_expired().await.unwrap(), 1);
    assert_eq!(backend.len().await, 1);
    assert!(backend.get(&kept).await.is_some());

    assert_eq!(store.try_sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn special_characters_are_stored_verbatim() {
    let (store, _, _) = store_with_clock();
    let key = derive_key("9999", "MN").unwrap();
    let payload = "emoji 🎉 and \"quotes\" <tags> & ampersands";

    store.store(payload, &key).await.unwrap();
    assert_eq!(store.fetch_by_key(&key).await.as_deref(), Some(payload));
}
