//! Usage tracking.
//!
//! Records per-command invocation counts. The backing store only offers a
//! non-atomic read-then-write pair, so the tracker serializes its own
//! read-modify-write sequence behind a single async mutex — usage recording
//! is off the latency-critical path and must not race with itself, or a
//! freshly seen command would get two "create with count 1" writes and lose
//! an increment.
//!
//! Recording never fails the caller: storage errors are logged and swallowed
//! so the response path is never blocked by the stats path.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{trace, warn};

use anvil_core::store::UsageStore;

/// Serialized increment-or-create over a [`UsageStore`].
pub struct UsageTracker {
    store: Arc<dyn UsageStore>,
    gate: Mutex<()>,
}

impl UsageTracker {
    /// Creates a tracker writing through `store`.
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
        }
    }

    /// Increments the invocation count for `command`, creating the record on
    /// first use. Errors are logged, never propagated.
    pub async fn record_invocation(&self, command: &str) {
        let _guard = self.gate.lock().await;

        let current = match self.store.usage(command).await {
            Ok(count) => count.unwrap_or(0),
            Err(error) => {
                warn!(command, %error, "Failed to read usage count, skipping update");
                return;
            }
        };

        match self.store.put_usage(command, current + 1).await {
            Ok(()) => trace!(command, count = current + 1, "Recorded invocation"),
            Err(error) => {
                warn!(command, %error, "Failed to persist usage count");
            }
        }
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use futures::future::join_all;

    use anvil_core::error::{StorageError, StorageResult};
    use anvil_core::store::MemoryStore;

    /// Wraps [`MemoryStore`] and yields between the read and the write, so an
    /// unserialized read-modify-write would interleave and lose updates.
    struct YieldingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl UsageStore for YieldingStore {
        async fn usage(&self, command: &str) -> StorageResult<Option<u64>> {
            let count = self.inner.usage(command).await;
            tokio::task::yield_now().await;
            count
        }

        async fn put_usage(&self, command: &str, count: u64) -> StorageResult<()> {
            self.inner.put_usage(command, count).await
        }
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(YieldingStore {
            inner: MemoryStore::new(),
        });
        let tracker = Arc::new(UsageTracker::new(store.clone()));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                tokio::spawn(async move { tracker.record_invocation("ocr google").await })
            })
            .collect();
        join_all(tasks).await;

        assert_eq!(store.inner.usage("ocr google").await.unwrap(), Some(32));
    }

    #[tokio::test]
    async fn storage_errors_are_swallowed() {
        struct BrokenStore;

        #[async_trait]
        impl UsageStore for BrokenStore {
            async fn usage(&self, _command: &str) -> StorageResult<Option<u64>> {
                Err(StorageError::Unavailable("no disk".into()))
            }

            async fn put_usage(&self, _command: &str, _count: u64) -> StorageResult<()> {
                Err(StorageError::Unavailable("no disk".into()))
            }
        }

        // Must return normally; the dispatch path never sees the failure.
        UsageTracker::new(Arc::new(BrokenStore))
            .record_invocation("ping")
            .await;
    }

    #[tokio::test]
    async fn first_use_creates_the_record() {
        let store = Arc::new(MemoryStore::new());
        let tracker = UsageTracker::new(store.clone());

        tracker.record_invocation("ping").await;
        tracker.record_invocation("ping").await;

        assert_eq!(store.usage("ping").await.unwrap(), Some(2));
    }
}
