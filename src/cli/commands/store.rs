//! Store command handler

use crate::keys::{KeyHash, Letters, Pin};
use crate::store::RecordStore;
use crate::validation::validate_content;

pub async fn cmd_store(
    store: &RecordStore,
    payload: &str,
    pin: &str,
    letters: &str,
) -> anyhow::Result<()> {
    let pin = Pin::parse(pin)?;
    let letters = Letters::parse(letters)?;

    validate_content(payload)?;

    let key = KeyHash::derive(&pin, &letters);
    match store.try_store(payload, &key).await {
        Ok(id) => {
            let expires = (store.now() + store.ttl()).format("%H:%M:%S UTC");
            println!("✓ Stored as {id} (expires {expires})");
            println!("Retrieve with PIN {pin} and letters {letters}.");
            Ok(())
        }
        Err(e) => anyhow::bail!("Failed to save data: {e}"),
    }
}
