//! Deletion of superseded generations at activation time.

use glassboat_core::{CacheName, CacheStore, Error};

/// Delete every cache of the same app whose generation is not `current`.
///
/// Caches that do not parse as `<app-id>-<generation>` or that belong to a
/// different app id are left alone. Returns the deleted names.
pub async fn reap(store: &dyn CacheStore, current: &CacheName) -> Result<Vec<String>, Error> {
    let current_name = current.to_string();
    let mut deleted = Vec::new();

    for name in store.list_generations().await? {
        if name == current_name || !current.is_sibling(&name) {
            continue;
        }
        if store.delete_generation(&name).await? {
            tracing::info!(cache = %name, current = %current_name, "deleted superseded generation");
            deleted.push(name);
        }
    }

    Ok(deleted)
}
