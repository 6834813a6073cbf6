//! Persistence contracts.
//!
//! The pipeline reads user standing and reads/writes usage counters through
//! these traits; the concrete store lives with the embedding application.
//! [`MemoryStore`] is the built-in in-process implementation used by tests
//! and demos.
//!
//! Neither contract is atomic at the storage layer: `usage`/`put_usage` is a
//! plain read-then-write pair, and the usage tracker is responsible for
//! serializing its own read-modify-write sequence.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

// ============================================================================
// User Standing
// ============================================================================

/// A user's stored standing with the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStanding {
    /// Normal user. Users with no stored record are active.
    Active,
    /// Blocked, with an optional operator-supplied reason shown on rejection.
    Blacklisted {
        /// Why the user was blacklisted, if recorded.
        reason: Option<String>,
    },
    /// Blocked without telling the user: every interaction is dropped with no
    /// observable difference from a bot that never answers.
    ShadowBlacklisted,
}

/// Read access to per-user standing.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the stored standing for `user_id`; absent users are
    /// [`UserStanding::Active`].
    async fn user_standing(&self, user_id: u64) -> StorageResult<UserStanding>;
}

// ============================================================================
// Usage Counters
// ============================================================================

/// Read/write access to per-command usage counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Returns the stored invocation count for `command`, if any.
    async fn usage(&self, command: &str) -> StorageResult<Option<u64>>;

    /// Stores `count` as the invocation count for `command`, creating the
    /// record if absent.
    async fn put_usage(&self, command: &str, count: u64) -> StorageResult<()>;
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-process [`UserStore`] + [`UsageStore`] backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<u64, UserStanding>>,
    usage: RwLock<HashMap<String, u64>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the standing for `user_id`.
    pub fn set_standing(&self, user_id: u64, standing: UserStanding) {
        self.users.write().insert(user_id, standing);
    }

    /// Returns all usage counters, highest first.
    pub fn usage_snapshot(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .usage
            .read()
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_standing(&self, user_id: u64) -> StorageResult<UserStanding> {
        Ok(self
            .users
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or(UserStanding::Active))
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn usage(&self, command: &str) -> StorageResult<Option<u64>> {
        Ok(self.usage.read().get(command).copied())
    }

    async fn put_usage(&self, command: &str, count: u64) -> StorageResult<()> {
        self.usage.write().insert(command.to_string(), count);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("users", &self.users.read().len())
            .field("usage", &self.usage.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_users_are_active() {
        let store = MemoryStore::new();
        assert_eq!(store.user_standing(1).await.unwrap(), UserStanding::Active);

        store.set_standing(
            1,
            UserStanding::Blacklisted {
                reason: Some("spam".into()),
            },
        );
        assert_eq!(
            store.user_standing(1).await.unwrap(),
            UserStanding::Blacklisted {
                reason: Some("spam".into())
            }
        );
    }

    #[tokio::test]
    async fn usage_roundtrip_and_snapshot_order() {
        let store = MemoryStore::new();
        assert_eq!(store.usage("ping").await.unwrap(), None);

        store.put_usage("ping", 3).await.unwrap();
        store.put_usage("stats", 7).await.unwrap();
        assert_eq!(store.usage("ping").await.unwrap(), Some(3));

        let snapshot = store.usage_snapshot();
        assert_eq!(
            snapshot,
            vec![("stats".to_string(), 7), ("ping".to_string(), 3)]
        );
    }
}
