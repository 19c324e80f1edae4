//! In-process table used by `--memory` runs and by tests.

use super::backend::{BackendError, RecordBackend};
use crate::keys::KeyHash;
use crate::models::{Record, RecordId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    rows: Arc<RwLock<HashMap<RecordId, Record>>>,

    offline: Arc<AtomicBool>,

    /// Inserts with a longer payload are refused, like a request-size limit.
    max_payload_chars: Arc<AtomicUsize>,

    inserts: Arc<AtomicUsize>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with [`BackendError::Unavailable`] while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn limit_payload_chars(&self, limit: usize) {
        self.max_payload_chars.store(limit, Ordering::SeqCst);
    }

    /// Writes a row as-is, bypassing the store. Handy for planting rows
    /// that are already expired.
    pub async fn put(&self, record: Record) {
        self.rows.write().await.insert(record.id.clone(), record);
    }

    pub async fn get(&self, id: &RecordId) -> Option<Record> {
        self.rows.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Insert attempts seen so far, successful or not.
    #[must_use]
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn insert(&self, record: &Record) -> Result<(), BackendError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let limit = self.max_payload_chars.load(Ordering::SeqCst);
        if limit > 0 && record.payload.chars().count() > limit {
            return Err(BackendError::Status {
                status: 413,
                body: "payload too large".to_string(),
            });
        }

        let mut rows = self.rows.write().await;
        if rows.contains_key(&record.id) {
            return Err(BackendError::Status {
                status: 409,
                body: format!("duplicate key value violates unique constraint: {}", record.id),
            });
        }
        rows.insert(record.id.clone(), record.clone());
        debug!(id = %record.id, rows = rows.len(), "Inserted row");
        Ok(())
    }

    async fn latest_by_key(&self, key_hash: &KeyHash) -> Result<Option<Record>, BackendError> {
        self.ensure_online()?;

        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| &r.key_hash == key_hash)
            .max_by_key(|r| r.expires_at)
            .cloned())
    }

    async fn find(
        &self,
        id: &RecordId,
        key_hash: &KeyHash,
    ) -> Result<Option<Record>, BackendError> {
        self.ensure_online()?;

        let rows = self.rows.read().await;
        Ok(rows.get(id).filter(|r| &r.key_hash == key_hash).cloned())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError> {
        self.ensure_online()?;

        self.rows.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, BackendError> {
        self.ensure_online()?;

        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| r.expires_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }

    async fn probe(&self) -> Result<(), BackendError> {
        self.ensure_online()
    }
}
