/// Stable device identity
///
/// Idempotency keys are namespaced by device id, so the id must survive
/// restarts. When none is configured one is generated on first use and kept
/// in the database's device identity table.
use crate::error::Result;
use patrol_storage::{device_identity, EventStore};

/// Return the configured id, or the stored one, or a freshly stored one
pub async fn resolve_device_id(store: &EventStore, configured: Option<&str>) -> Result<String> {
    if let Some(id) = configured.filter(|id| !id.trim().is_empty()) {
        return Ok(id.to_string());
    }

    if let Some(id) = device_identity::load(store.pool()).await? {
        return Ok(id);
    }

    let candidate = uuid::Uuid::new_v4().to_string();
    Ok(device_identity::get_or_insert(store.pool(), &candidate).await?)
}
