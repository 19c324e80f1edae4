use crate::store::RecordStore;

pub async fn cmd_sweep(store: &RecordStore) -> anyhow::Result<()> {
    let removed = store.try_sweep_expired().await?;

    if removed == 0 {
        println!("No expired records.");
    } else {
        println!("✓ Removed {removed} expired record(s)");
    }

    Ok(())
}
