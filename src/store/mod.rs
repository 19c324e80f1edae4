//! Record store: the four row operations plus the expiry rules.
//!
//! Each operation has a tagged form (`try_*` / `lookup_*`) that keeps the
//! cause of a miss, and a plain form that folds every failure into `None` or
//! `false`. The interactive flow only uses the plain forms, so "wrong PIN",
//! "expired" and "backend unreachable" look the same to a user.

pub mod backend;
pub mod memory;

pub use backend::{BackendError, RecordBackend};
pub use memory::MemoryBackend;

use crate::clients::postgrest::PostgrestClient;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::constants::records::TTL_SECONDS;
use crate::keys::KeyHash;
use crate::models::{Record, RecordId};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a read, before it is collapsed for display.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Record),
    NotFound,
    /// A row matched but had expired; it has been deleted (best-effort).
    Expired,
    Transport(BackendError),
}

impl FetchOutcome {
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Found(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_payload(self) -> Option<String> {
        self.into_record().map(|r| r.payload)
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::Transport(_) => "transport_error",
        }
    }
}

#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl RecordStore {
    #[must_use]
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            ttl: Duration::seconds(TTL_SECONDS),
        }
    }

    /// Store backed by the configured PostgREST endpoint.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = PostgrestClient::from_config(&config.backend)?;
        Ok(Self::new(Arc::new(client)).with_ttl(config.session.ttl()))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn try_store(
        &self,
        payload: &str,
        key_hash: &KeyHash,
    ) -> Result<RecordId, BackendError> {
        self.try_store_with_ttl(payload, key_hash, self.ttl).await
    }

    pub async fn try_store_with_ttl(
        &self,
        payload: &str,
        key_hash: &KeyHash,
        ttl: Duration,
    ) -> Result<RecordId, BackendError> {
        let record = Record::new(payload.to_string(), key_hash.clone(), self.now(), ttl);

        debug!(
            id = %record.id,
            key = key_hash.prefix(),
            payload_chars = payload.chars().count(),
            expires_at = %record.expires_at,
            "Storing record"
        );

        self.backend.insert(&record).await?;

        info!(id = %record.id, "Record stored");
        Ok(record.id)
    }

    /// Inserts a new record expiring one TTL from now. `None` on any
    /// backend failure.
    pub async fn store(&self, payload: &str, key_hash: &KeyHash) -> Option<RecordId> {
        match self.try_store(payload, key_hash).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, key = key_hash.prefix(), "Failed to store record");
                None
            }
        }
    }

    pub async fn lookup_by_key(&self, key_hash: &KeyHash) -> FetchOutcome {
        let found = self.backend.latest_by_key(key_hash).await;
        let outcome = self.check_expiry(found).await;
        debug!(key = key_hash.prefix(), outcome = outcome.label(), "Lookup by key");
        outcome
    }

    /// Payload of the latest-expiring record for this key.
    pub async fn fetch_by_key(&self, key_hash: &KeyHash) -> Option<String> {
        self.lookup_by_key(key_hash).await.into_payload()
    }

    pub async fn lookup_by_id(&self, id: &RecordId, key_hash: &KeyHash) -> FetchOutcome {
        let found = self.backend.find(id, key_hash).await;
        let outcome = self.check_expiry(found).await;
        debug!(%id, key = key_hash.prefix(), outcome = outcome.label(), "Lookup by id");
        outcome
    }

    pub async fn fetch_by_id(&self, id: &RecordId, key_hash: &KeyHash) -> Option<String> {
        self.lookup_by_id(id, key_hash).await.into_payload()
    }

    pub async fn try_delete_by_id(&self, id: &RecordId) -> Result<(), BackendError> {
        self.backend.delete(id).await?;
        debug!(%id, "Record deleted");
        Ok(())
    }

    /// `true` unless the backend failed. A missing id counts as deleted.
    pub async fn delete_by_id(&self, id: &RecordId) -> bool {
        match self.try_delete_by_id(id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%id, error = %e, "Failed to delete record");
                false
            }
        }
    }

    /// Deletes every record whose expiry is strictly in the past.
    pub async fn try_sweep_expired(&self) -> Result<u64, BackendError> {
        self.backend.delete_expired(self.now()).await
    }

    pub async fn probe(&self) -> Result<(), BackendError> {
        self.backend.probe().await
    }

    async fn check_expiry(&self, found: Result<Option<Record>, BackendError>) -> FetchOutcome {
        let record = match found {
            Ok(Some(record)) => record,
            Ok(None) => return FetchOutcome::NotFound,
            Err(e) => {
                warn!(error = %e, "Record lookup failed");
                return FetchOutcome::Transport(e);
            }
        };

        if !record.is_expired_at(self.now()) {
            return FetchOutcome::Found(record);
        }

        info!(id = %record.id, expires_at = %record.expires_at, "Record expired, deleting");
        if let Err(e) = self.backend.delete(&record.id).await {
            warn!(id = %record.id, error = %e, "Failed to delete expired record");
        }
        FetchOutcome::Expired
    }
}
