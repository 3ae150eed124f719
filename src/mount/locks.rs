//! Per-target mutual exclusion for check-then-act mount sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of locks keyed by target path.
///
/// Entries are created on demand and pruned once no caller holds or waits
/// on them.
#[derive(Debug, Default)]
pub struct TargetLocks {
    entries: Mutex<HashMap<Utf8PathBuf, Weak<AsyncMutex<()>>>>,
}

/// Guard holding exclusive access to one target path.
#[derive(Debug)]
pub struct TargetGuard {
    _guard: OwnedMutexGuard<()>,
}

impl TargetLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `target`.
    pub async fn lock(&self, target: &Utf8Path) -> TargetGuard {
        let cell = self.cell_for(target);
        TargetGuard {
            _guard: cell.lock_owned().await,
        }
    }

    /// Number of targets currently held or awaited.
    #[must_use]
    pub fn active(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, cell| cell.strong_count() > 0);
        entries.len()
    }

    fn cell_for(&self, target: &Utf8Path) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, cell| cell.strong_count() > 0);
        if let Some(existing) = entries.get(target).and_then(Weak::upgrade) {
            return existing;
        }
        let cell = Arc::new(AsyncMutex::new(()));
        entries.insert(target.to_owned(), Arc::downgrade(&cell));
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn released_targets_leave_the_registry() {
        let locks = TargetLocks::new();
        let guard = locks.lock(Utf8Path::new("/mnt/a")).await;
        assert_eq!(locks.active(), 1);
        drop(guard);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn distinct_targets_do_not_block_each_other() {
        let locks = TargetLocks::new();
        let _first = locks.lock(Utf8Path::new("/mnt/a")).await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.lock(Utf8Path::new("/mnt/b")))
            .await;
        assert!(second.is_ok(), "lock on another target should not wait");
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn same_target_waits_for_release() {
        let locks = Arc::new(TargetLocks::new());
        let first = locks.lock(Utf8Path::new("/mnt/a")).await;

        let contender = {
            let registry = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = registry.lock(Utf8Path::new("/mnt/a")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished(), "second caller should wait");

        drop(first);
        contender.await.expect("contender task should finish");
        assert_eq!(locks.active(), 0);
    }
}
