//! The five-screen flow: scan, look at the content, protect it with a PIN
//! and two letters, or retrieve something protected elsewhere and watch it
//! count down to deletion.
//!
//! Each transition gets a fresh [`CancellationToken`] and cancels the
//! previous one. Network-bound actions are split into `begin_*` (validate,
//! capture the token), `execute` (the backend call, no session borrow) and
//! `finish_*` (apply). A result whose token was cancelled in the meantime is
//! discarded, so a late response never lands on a screen the user has left.

pub mod form;
pub mod screen;

pub use form::PinForm;
pub use screen::{Notice, Screen, format_countdown, is_urgent, is_url, truncate_chars};

use crate::config::SessionConfig;
use crate::constants::{messages, session};
use crate::keys::{KeyHash, Letters, Pin};
use crate::models::RecordId;
use crate::store::{FetchOutcome, RecordStore};
use crate::validation::{ValidationError, validate_content};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Not available on the {0} screen")]
    WrongScreen(&'static str),
}

/// Whether a finished request was applied or arrived too late.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    Applied(T),
    Stale,
}

impl<T> Completion<T> {
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub countdown_seconds: u32,
    pub max_payload_chars: usize,
    pub fallback_payload_chars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: session::COUNTDOWN_SECONDS,
            max_payload_chars: session::MAX_PAYLOAD_CHARS,
            fallback_payload_chars: session::FALLBACK_PAYLOAD_CHARS,
        }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            countdown_seconds: config.countdown_seconds,
            max_payload_chars: config.max_payload_chars,
            fallback_payload_chars: config.fallback_payload_chars,
        }
    }
}

/// A validated save, ready to send.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    ticket: CancellationToken,
    key: KeyHash,
    pin: Pin,
    letters: Letters,
    payload: String,
    fallback: String,
}

impl SaveRequest {
    /// Stores the payload, retrying once with the shorter fallback payload.
    /// The retry is skipped if the session has already moved on.
    pub async fn execute(&self, store: &RecordStore) -> Option<RecordId> {
        if let Some(id) = store.store(&self.payload, &self.key).await {
            return Some(id);
        }

        if self.ticket.is_cancelled() {
            return None;
        }

        info!(
            fallback_chars = self.fallback.chars().count(),
            "First attempt failed, retrying with shortened content"
        );
        store.store(&self.fallback, &self.key).await
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.ticket.is_cancelled()
    }
}

/// A validated retrieve, ready to send.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    ticket: CancellationToken,
    key: KeyHash,
}

impl VerifyRequest {
    pub async fn execute(&self, store: &RecordStore) -> FetchOutcome {
        store.lookup_by_key(&self.key).await
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.ticket.is_cancelled()
    }
}

pub struct Session {
    store: RecordStore,
    settings: SessionSettings,
    screen: Screen,
    error: Option<String>,
    ticket: CancellationToken,
}

impl Session {
    #[must_use]
    pub fn new(store: RecordStore, settings: SessionSettings) -> Self {
        Self {
            store,
            settings,
            screen: Screen::Scanning,
            error: None,
            ticket: CancellationToken::new(),
        }
    }

    #[must_use]
    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Inline validation or failure message for the current screen.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    fn go(&mut self, screen: Screen) {
        debug!(from = self.screen.name(), to = screen.name(), "Screen transition");
        self.ticket.cancel();
        self.ticket = CancellationToken::new();
        self.error = None;
        self.screen = screen;
    }

    fn reject(&mut self, err: ValidationError) -> SessionError {
        self.error = Some(err.to_string());
        SessionError::Invalid(err)
    }

    /// A QR code was decoded while scanning.
    pub fn scan(&mut self, payload: String) -> Result<(), SessionError> {
        if !matches!(self.screen, Screen::Scanning) {
            return Err(SessionError::WrongScreen(self.screen.name()));
        }
        debug!(chars = payload.chars().count(), "Scanned payload");
        self.go(Screen::ViewingScanned { content: payload });
        Ok(())
    }

    /// Starts protecting the scanned content with a fresh PIN form.
    pub fn enable_sync(&mut self) -> Result<(), SessionError> {
        let Screen::ViewingScanned { content } = &self.screen else {
            return Err(SessionError::WrongScreen(self.screen.name()));
        };
        let content = content.clone();
        self.go(Screen::CreatingPin {
            content,
            form: PinForm::default(),
        });
        Ok(())
    }

    /// Starts retrieving with a fresh PIN form.
    pub fn access(&mut self) -> Result<(), SessionError> {
        if !matches!(self.screen, Screen::Scanning) {
            return Err(SessionError::WrongScreen(self.screen.name()));
        }
        self.go(Screen::EnteringPin {
            form: PinForm::default(),
        });
        Ok(())
    }

    /// Back out of the current screen. Retrieved data can only be left by
    /// deleting it or letting it expire.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        let next = match &self.screen {
            Screen::ViewingScanned { .. } | Screen::EnteringPin { .. } => Screen::Scanning,
            Screen::CreatingPin { content, .. } => Screen::ViewingScanned {
                content: content.clone(),
            },
            Screen::Scanning | Screen::ViewingRetrieved { .. } => {
                return Err(SessionError::WrongScreen(self.screen.name()));
            }
        };
        self.go(next);
        Ok(())
    }

    /// The PIN form of the current screen, for editing.
    pub fn form_mut(&mut self) -> Option<&mut PinForm> {
        match &mut self.screen {
            Screen::CreatingPin { form, .. } | Screen::EnteringPin { form } => Some(form),
            _ => None,
        }
    }

    pub fn begin_save(&mut self) -> Result<SaveRequest, SessionError> {
        let Screen::CreatingPin { content, form } = &self.screen else {
            return Err(SessionError::WrongScreen(self.screen.name()));
        };

        let (pin, letters) = match form.validate() {
            Ok(valid) => valid,
            Err(e) => return Err(self.reject(e)),
        };

        if let Err(e) = validate_content(content) {
            return Err(self.reject(e));
        }

        let payload = truncate_chars(content, self.settings.max_payload_chars).to_string();
        let fallback = truncate_chars(content, self.settings.fallback_payload_chars).to_string();
        if payload.len() < content.len() {
            info!(
                chars = content.chars().count(),
                limit = self.settings.max_payload_chars,
                "Content is very long, truncating"
            );
        }

        self.error = None;
        Ok(SaveRequest {
            ticket: self.ticket.clone(),
            key: KeyHash::derive(&pin, &letters),
            pin,
            letters,
            payload,
            fallback,
        })
    }

    pub fn finish_save(
        &mut self,
        request: SaveRequest,
        result: Option<RecordId>,
    ) -> Completion<Option<Notice>> {
        if request.is_stale() {
            debug!(stored = result.is_some(), "Discarding stale save result");
            return Completion::Stale;
        }

        match result {
            Some(id) => {
                self.go(Screen::Scanning);
                Completion::Applied(Some(Notice::Saved {
                    id,
                    pin: request.pin,
                    letters: request.letters,
                }))
            }
            None => {
                warn!("Failed to store data after multiple attempts");
                self.error = Some(messages::SAVE_FAILED.to_string());
                Completion::Applied(None)
            }
        }
    }

    /// Validates, stores (with one fallback retry) and applies the result.
    pub async fn save(&mut self) -> Result<Completion<Option<Notice>>, SessionError> {
        let request = self.begin_save()?;
        let result = request.execute(&self.store).await;
        Ok(self.finish_save(request, result))
    }

    pub fn begin_verify(&mut self) -> Result<VerifyRequest, SessionError> {
        let Screen::EnteringPin { form } = &self.screen else {
            return Err(SessionError::WrongScreen(self.screen.name()));
        };

        let (pin, letters) = match form.validate() {
            Ok(valid) => valid,
            Err(e) => return Err(self.reject(e)),
        };

        self.error = None;
        Ok(VerifyRequest {
            ticket: self.ticket.clone(),
            key: KeyHash::derive(&pin, &letters),
        })
    }

    /// Applies a lookup. Every miss shows the same message whatever the
    /// cause; `Applied(true)` means the data is now on screen.
    pub fn finish_verify(
        &mut self,
        request: VerifyRequest,
        outcome: FetchOutcome,
    ) -> Completion<bool> {
        if request.is_stale() {
            debug!(outcome = outcome.label(), "Discarding stale lookup result");
            return Completion::Stale;
        }

        match outcome {
            FetchOutcome::Found(record) => {
                self.go(Screen::ViewingRetrieved {
                    content: record.payload,
                    record_id: record.id,
                    remaining: self.settings.countdown_seconds,
                });
                Completion::Applied(true)
            }
            other => {
                debug!(cause = other.label(), "Retrieve failed");
                self.error = Some(messages::RETRIEVE_FAILED.to_string());
                Completion::Applied(false)
            }
        }
    }

    pub async fn verify(&mut self) -> Result<Completion<bool>, SessionError> {
        let request = self.begin_verify()?;
        let outcome = request.execute(&self.store).await;
        Ok(self.finish_verify(request, outcome))
    }

    /// One second of countdown. At zero the record is deleted and the
    /// session returns to scanning.
    pub async fn tick(&mut self) -> Option<Notice> {
        let Screen::ViewingRetrieved {
            record_id,
            remaining,
            ..
        } = &mut self.screen
        else {
            return None;
        };

        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return None;
        }

        let id = record_id.clone();
        info!(%id, "Countdown finished, deleting record");
        self.go(Screen::Scanning);
        let confirmed = self.store.delete_by_id(&id).await;
        Some(Notice::Expired { id, confirmed })
    }

    /// Deletes the retrieved record now and returns to scanning, whether or
    /// not the delete succeeded.
    pub async fn delete_now(&mut self) -> Result<Notice, SessionError> {
        let Screen::ViewingRetrieved { record_id, .. } = &self.screen else {
            return Err(SessionError::WrongScreen(self.screen.name()));
        };

        let id = record_id.clone();
        self.go(Screen::Scanning);
        let confirmed = self.store.delete_by_id(&id).await;
        Ok(Notice::Deleted { id, confirmed })
    }
}
