//! L1 Expiry Sweep
//!
//! Background task that periodically removes expired local entries, so keys
//! that are never read again do not occupy capacity until evicted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::LocalStore;

/// Spawns a task that sweeps expired entries from the local store.
///
/// The task sleeps for `interval` between sweeps and runs until aborted
/// through the returned handle (the server does so on shutdown).
///
/// # Example
/// ```ignore
/// let local = Arc::new(RwLock::new(LocalStore::new(2000, 300)));
/// let handle = spawn_sweep_task(local.clone(), Duration::from_secs(120));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(local: Arc<RwLock<LocalStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting L1 sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = local.write().await.cleanup_expired();

            if removed > 0 {
                info!("L1 sweep: removed {} expired entries", removed);
            } else {
                debug!("L1 sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_store() -> Arc<RwLock<LocalStore>> {
        Arc::new(RwLock::new(LocalStore::new(100, 300)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let local = shared_store();
        local
            .write()
            .await
            .set("expire_soon", "1".to_string(), Some(Duration::from_secs(1)));

        let handle = spawn_sweep_task(local.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;

        // The sweep dropped the entry without any read touching it
        assert!(local.read().await.is_empty());
        assert_eq!(local.read().await.stats().expirations, 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_preserves_valid_entries() {
        let local = shared_store();
        local
            .write()
            .await
            .set("long_lived", "1".to_string(), Some(Duration::from_secs(3600)));
        local.write().await.set("hot", "2".to_string(), None);

        let handle = spawn_sweep_task(local.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let mut guard = local.write().await;
        assert_eq!(guard.get("long_lived").as_deref(), Some("1"));
        assert_eq!(guard.get("hot").as_deref(), Some("2"));
        drop(guard);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let handle = spawn_sweep_task(shared_store(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
