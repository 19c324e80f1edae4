//! Fetch command handlers

use crate::constants::messages;
use crate::keys::{KeyHash, Letters, Pin};
use crate::models::RecordId;
use crate::store::{FetchOutcome, RecordStore};
use tracing::debug;

pub async fn cmd_fetch(store: &RecordStore, pin: &str, letters: &str) -> anyhow::Result<()> {
    let key = key_from(pin, letters)?;
    print_outcome(store.lookup_by_key(&key).await);
    Ok(())
}

pub async fn cmd_get(
    store: &RecordStore,
    id: &str,
    pin: &str,
    letters: &str,
) -> anyhow::Result<()> {
    let key = key_from(pin, letters)?;
    print_outcome(store.lookup_by_id(&RecordId::new(id), &key).await);
    Ok(())
}

fn key_from(pin: &str, letters: &str) -> anyhow::Result<KeyHash> {
    let pin = Pin::parse(pin)?;
    let letters = Letters::parse(letters)?;
    Ok(KeyHash::derive(&pin, &letters))
}

fn print_outcome(outcome: FetchOutcome) {
    debug!(outcome = outcome.label(), "Fetch finished");

    match outcome {
        FetchOutcome::Found(record) => println!("{}", record.payload),
        _ => println!("{}", messages::RETRIEVE_FAILED),
    }
}
