//! Per-unit exclusive sections
//!
//! A batch reads the unit's issues, decides, then writes. Two batches for
//! the same unit running side by side could both decide "new" for the same
//! finding, so batches take the unit's lock for their whole run. Batches for
//! different units do not contend.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-unit mutexes
#[derive(Clone, Default)]
pub struct UnitLocks {
    units: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl UnitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a unit
    ///
    /// Entries nobody holds or waits on are dropped from the registry here,
    /// so it only grows with the number of units busy at once.
    pub async fn lock(&self, unit_id: Uuid) -> OwnedMutexGuard<()> {
        let unit_lock = {
            let mut units = self.units.lock().await;
            units.retain(|id, lock| *id == unit_id || Arc::strong_count(lock) > 1);
            units
                .entry(unit_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        unit_lock.lock_owned().await
    }

    /// Number of units currently in the registry
    pub async fn tracked_units(&self) -> usize {
        self.units.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_unit_is_exclusive() {
        let locks = UnitLocks::new();
        let unit = Uuid::new_v4();

        let guard = locks.lock(unit).await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.lock(unit).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_units_do_not_block() {
        let locks = UnitLocks::new();
        let _a = locks.lock(Uuid::new_v4()).await;

        let b = tokio::time::timeout(Duration::from_millis(200), locks.lock(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_units_are_pruned() {
        let locks = UnitLocks::new();

        for _ in 0..5 {
            let _guard = locks.lock(Uuid::new_v4()).await;
        }

        let _held = locks.lock(Uuid::new_v4()).await;
        assert_eq!(locks.tracked_units().await, 1);
    }
}
