use chrono::NaiveDate;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per (employee, day). The cache has no size bound, so a lock is never
/// refused admission or evicted by pressure; only entries idle for two days expire, by
/// which time the day they guard is closed. The store still rejects a second check-out,
/// which covers several processes sharing one database.
#[derive(Clone)]
pub struct KeyLocks {
    locks: Cache<(u64, NaiveDate), Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self {
            locks: Cache::builder()
                .time_to_idle(Duration::from_secs(2 * 86400))
                .build(),
        }
    }

    /// Waits until no other caller holds the same key.
    pub async fn acquire(&self, subject_id: u64, day: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with((subject_id, day), async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new()
    }
}
