use crate::store::RecordStore;
use tracing::{info, warn};

/// One-shot garbage collection of expired rows.
///
/// There is no schedule: a row whose expiry has passed stays in the table
/// until either this runs or a read touches it.
#[derive(Clone)]
pub struct ExpirySweeper {
    store: RecordStore,
}

impl ExpirySweeper {
    #[must_use]
    pub const fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Deletes rows that expired before now. Failures are logged, never
    /// returned; the count is `None` when the sweep did not complete.
    pub async fn sweep(&self) -> Option<u64> {
        match self.store.try_sweep_expired().await {
            Ok(removed) => {
                if removed > 0 {
                    info!(removed, "Swept expired records");
                }
                Some(removed)
            }
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed");
                None
            }
        }
    }

    /// Runs [`Self::sweep`] on a detached task.
    pub fn spawn(self) -> tokio::task::JoinHandle<Option<u64>> {
        tokio::spawn(async move { self.sweep().await })
    }
}
