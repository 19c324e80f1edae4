use crate::keys::KeyHash;
use crate::models::{Record, RecordId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the table backend. The store collapses all of these into
/// "absent" for callers that only see the outer surface.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Backend configuration error: {0}")]
    Config(String),

    #[error("Backend unavailable")]
    Unavailable,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Row-level access to the `qr_data` table.
///
/// Implementations do no expiry filtering of their own; the store decides
/// what an expired row means.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn insert(&self, record: &Record) -> Result<(), BackendError>;

    /// The row with this key that expires last, if any.
    async fn latest_by_key(&self, key_hash: &KeyHash) -> Result<Option<Record>, BackendError>;

    /// The row matching both id and key, if any.
    async fn find(&self, id: &RecordId, key_hash: &KeyHash)
    -> Result<Option<Record>, BackendError>;

    /// Deleting an id that does not exist is not an error.
    async fn delete(&self, id: &RecordId) -> Result<(), BackendError>;

    /// Deletes every row with `expires_at` strictly before `cutoff` and
    /// returns how many went.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, BackendError>;

    /// Cheap read used by connection diagnostics.
    async fn probe(&self) -> Result<(), BackendError>;
}
