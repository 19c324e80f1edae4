//! Backend diagnostics: a connection check and a storage self-test.
//!
//! Both leave nothing behind on success; every row they write is deleted
//! before they return.

use crate::keys::{KeyHash, derive_key};
use crate::models::RecordId;
use crate::store::{FetchOutcome, RecordStore};
use chrono::Duration;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckStep {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckStep {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub steps: Vec<CheckStep>,
}

impl CheckReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.passed)
    }

    fn push(&mut self, step: CheckStep) -> bool {
        if step.passed {
            info!(step = %step.name, "{}", step.detail);
        } else {
            warn!(step = %step.name, "{}", step.detail);
        }
        let passed = step.passed;
        self.steps.push(step);
        passed
    }
}

pub struct Diagnostics {
    store: RecordStore,
}

impl Diagnostics {
    #[must_use]
    pub const fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Reads from the table, then writes and deletes a one-minute test row.
    /// Stops at the first failing step.
    pub async fn connection_check(&self) -> CheckReport {
        let mut report = CheckReport::default();

        let probe = match self.store.probe().await {
            Ok(()) => CheckStep::pass("select", "Connected and the table exists"),
            Err(e) => CheckStep::fail("select", format!("Error connecting to backend: {e}")),
        };
        if !report.push(probe) {
            return report;
        }

        let key = KeyHash::from_digest("connection-check");
        let id = match self
            .store
            .try_store_with_ttl("test content", &key, Duration::minutes(1))
            .await
        {
            Ok(id) => {
                report.push(CheckStep::pass("insert", format!("Inserted test row {id}")));
                id
            }
            Err(e) => {
                report.push(CheckStep::fail("insert", format!("Insert test failed: {e}")));
                return report;
            }
        };

        let delete = match self.store.try_delete_by_id(&id).await {
            Ok(()) => CheckStep::pass("delete", format!("Deleted test row {id}")),
            Err(e) => CheckStep::fail("delete", format!("Delete test failed: {e}")),
        };
        report.push(delete);

        report
    }

    /// Stores payloads of increasing awkwardness and reads each one back.
    pub async fn storage_self_test(&self) -> CheckReport {
        let mut report = CheckReport::default();
        let mut written: Vec<RecordId> = Vec::new();

        let key = match derive_key("1234", "AB") {
            Ok(key) => key,
            Err(e) => {
                report.push(CheckStep::fail("key", e.to_string()));
                return report;
            }
        };

        for (name, payload) in self_test_payloads() {
            let step = match self.store.try_store(&payload, &key).await {
                Ok(id) => {
                    let step = match self.store.lookup_by_id(&id, &key).await {
                        FetchOutcome::Found(record) if record.payload == payload => {
                            CheckStep::pass(name, format!("Stored and read back {id}"))
                        }
                        FetchOutcome::Found(_) => {
                            CheckStep::fail(name, format!("Read back different content for {id}"))
                        }
                        other => CheckStep::fail(
                            name,
                            format!("Stored {id} but lookup reported {}", other.label()),
                        ),
                    };
                    written.push(id);
                    step
                }
                Err(e) => CheckStep::fail(name, format!("Failed to store: {e}")),
            };

            if !report.push(step) {
                break;
            }
        }

        for id in &written {
            if !self.store.delete_by_id(id).await {
                report.push(CheckStep::fail("cleanup", format!("Could not delete {id}")));
            }
        }

        report
    }
}

fn self_test_payloads() -> Vec<(&'static str, String)> {
    vec![
        ("simple text", "This is a test QR content".to_string()),
        (
            "long text",
            "https://example.com/this/is/a/much/longer/url/that/might/cause/issues/if/there/are/limits/in/the/database/or/api"
                .repeat(5),
        ),
        (
            "special characters",
            "Test with special chars: áéíóú, ñ, 汉字, ♥★☺".to_string(),
        ),
        (
            "json text",
            r#"{"type":"url","content":"https://example.com","title":"Example Website"}"#
                .to_string(),
        ),
    ]
}
