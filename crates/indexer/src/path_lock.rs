use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

const PRUNE_THRESHOLD: usize = 256;

static PATH_LOCK_WAIT_MS_MAX: AtomicU64 = AtomicU64::new(0);

/// Longest time any caller has waited for a per-path write lock in this process.
pub fn path_lock_wait_ms_max() -> u64 {
    PATH_LOCK_WAIT_MS_MAX.load(Ordering::Relaxed)
}

fn record_wait(key: &str, started: Instant) {
    let wait_ms = started.elapsed().as_millis() as u64;
    let mut current = PATH_LOCK_WAIT_MS_MAX.load(Ordering::Relaxed);
    while wait_ms > current {
        match PATH_LOCK_WAIT_MS_MAX.compare_exchange(
            current,
            wait_ms,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(next) => current = next,
        }
    }
    if wait_ms > 0 {
        log::trace!("Waited {wait_ms}ms for lock on '{key}'");
    }
}

/// Single-writer / multi-reader locks keyed by normalized sandbox path.
#[derive(Debug, Default)]
pub(crate) struct PathLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl PathLocks {
    fn entry(&self, key: &str) -> Arc<RwLock<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if locks.len() > PRUNE_THRESHOLD {
            // Only the map holds an unused lock.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    pub(crate) async fn write(&self, key: &str) -> OwnedRwLockWriteGuard<()> {
        let started = Instant::now();
        let guard = self.entry(key).write_owned().await;
        record_wait(key, started);
        guard
    }

    pub(crate) async fn read(&self, key: &str) -> OwnedRwLockReadGuard<()> {
        self.entry(key).read_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn writers_on_one_path_are_serialized() {
        let locks = Arc::new(PathLocks::default());
        let guard = locks.write("a.txt").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.write("a.txt").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(path_lock_wait_ms_max() >= 10);
    }

    #[tokio::test]
    async fn different_paths_do_not_block() {
        let locks = PathLocks::default();
        let _a = locks.write("a.txt").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.write("b.txt"))
            .await
            .expect("independent path must not wait");
    }

    #[tokio::test]
    async fn readers_share_a_path() {
        let locks = PathLocks::default();
        let _r1 = locks.read("a.txt").await;
        let _r2 = tokio::time::timeout(Duration::from_millis(100), locks.read("a.txt"))
            .await
            .expect("readers must not exclude each other");
    }
}
