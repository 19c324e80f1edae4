use crate::models::RecordId;
use crate::store::RecordStore;

pub async fn cmd_delete(store: &RecordStore, id: &str) -> anyhow::Result<()> {
    let id = RecordId::new(id.trim());

    if store.delete_by_id(&id).await {
        println!("✓ Deleted: {id}");
        Ok(())
    } else {
        anyhow::bail!("Failed to delete {id}")
    }
}
