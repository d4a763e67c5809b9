//! Per-slot async locks for filename allocation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Locks keyed by slot stem (`hansard_{YYYYMMDD}_{code}`).
///
/// Different slots never contend. Entries are `Arc`ed so the `DashMap`
/// shard lock is released before awaiting on the slot mutex.
#[derive(Debug, Default)]
pub struct SlotLocks {
    slots: DashMap<String, Arc<Mutex<()>>>,
}

impl SlotLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        slot.lock_owned().await
    }
}
