//! Access policy.
//!
//! Decides, per invoking user, whether an interaction is allowed, silently
//! dropped, or rejected with a localized message. The decision is a pure
//! function of the stored [`UserStanding`]; the policy itself has no state
//! and no side effects.

use std::sync::Arc;

use tracing::{debug, info, warn};

use anvil_core::interaction::Interaction;
use anvil_core::locale::{DEFAULT_CULTURE, Localizer, keys};
use anvil_core::store::{UserStanding, UserStore};

/// The outcome of one access evaluation. Produced fresh per event, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The interaction proceeds through the pipeline.
    Allowed,
    /// The interaction is discarded with no response and no trace the
    /// invoker could observe.
    DroppedSilently,
    /// The interaction is answered with a rejection message and goes no
    /// further.
    Rejected {
        /// The localized rejection message.
        message: String,
    },
}

/// Evaluates user standing against inbound interactions.
pub struct AccessPolicy {
    users: Arc<dyn UserStore>,
    localizer: Arc<dyn Localizer>,
}

impl AccessPolicy {
    /// Creates a policy reading standing from `users`.
    pub fn new(users: Arc<dyn UserStore>, localizer: Arc<dyn Localizer>) -> Self {
        Self { users, localizer }
    }

    /// Evaluates one interaction.
    ///
    /// - blacklisted + command/component → [`AccessDecision::Rejected`] with
    ///   the stored reason, localized to the invoker's culture
    /// - shadow-blacklisted → [`AccessDecision::DroppedSilently`] for every
    ///   kind, logged only at debug level
    /// - otherwise → [`AccessDecision::Allowed`]
    ///
    /// A failed standing lookup admits the event: blocking every user on a
    /// flaky store is worse than letting a blacklisted one through for one
    /// window.
    pub async fn evaluate(&self, interaction: &Interaction) -> AccessDecision {
        let user_id = interaction.user_id();

        let standing = match self.users.user_standing(user_id).await {
            Ok(standing) => standing,
            Err(error) => {
                warn!(user_id, %error, "User standing lookup failed, admitting interaction");
                return AccessDecision::Allowed;
            }
        };

        match standing {
            UserStanding::Active => AccessDecision::Allowed,
            UserStanding::Blacklisted { reason } if interaction.kind().interactive() => {
                info!(
                    user_id,
                    kind = %interaction.kind(),
                    "Blacklisted user tried to execute an interaction"
                );

                let culture = interaction.locale().unwrap_or(DEFAULT_CULTURE);
                let message = match reason {
                    Some(reason) => {
                        self.localizer
                            .localize(keys::BLACKLISTED_WITH_REASON, culture, &[&reason])
                    }
                    None => self.localizer.localize(keys::BLACKLISTED, culture, &[]),
                };

                AccessDecision::Rejected { message }
            }
            // Blacklisted users still get autocomplete suggestions; only
            // command execution is blocked.
            UserStanding::Blacklisted { .. } => AccessDecision::Allowed,
            UserStanding::ShadowBlacklisted => {
                debug!(
                    user_id,
                    kind = %interaction.kind(),
                    "Shadow-blacklisted user tried to execute an interaction"
                );
                AccessDecision::DroppedSilently
            }
        }
    }
}

impl std::fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPolicy").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use anvil_core::error::{StorageError, StorageResult};
    use anvil_core::locale::CatalogLocalizer;
    use anvil_core::store::MemoryStore;

    fn policy(store: Arc<MemoryStore>) -> AccessPolicy {
        AccessPolicy::new(store, Arc::new(CatalogLocalizer::with_defaults()))
    }

    #[tokio::test]
    async fn unknown_users_are_allowed() {
        let store = Arc::new(MemoryStore::new());
        let decision = policy(store)
            .evaluate(&Interaction::command(1, 7, "ping"))
            .await;
        assert_eq!(decision, AccessDecision::Allowed);
    }

    #[tokio::test]
    async fn blacklisted_user_is_rejected_with_reason() {
        let store = Arc::new(MemoryStore::new());
        store.set_standing(
            7,
            UserStanding::Blacklisted {
                reason: Some("spam".into()),
            },
        );

        let decision = policy(store)
            .evaluate(&Interaction::command(1, 7, "ping"))
            .await;
        let AccessDecision::Rejected { message } = decision else {
            panic!("expected rejection, got {decision:?}");
        };
        assert!(message.contains("spam"), "message was: {message}");
    }

    #[tokio::test]
    async fn blacklisted_user_without_reason_gets_generic_message() {
        let store = Arc::new(MemoryStore::new());
        store.set_standing(7, UserStanding::Blacklisted { reason: None });

        let decision = policy(store)
            .evaluate(&Interaction::component(1, 7, "ocr", "retry"))
            .await;
        assert_eq!(
            decision,
            AccessDecision::Rejected {
                message: "You're blacklisted.".into()
            }
        );
    }

    #[tokio::test]
    async fn blacklisted_user_keeps_autocomplete() {
        let store = Arc::new(MemoryStore::new());
        store.set_standing(7, UserStanding::Blacklisted { reason: None });

        let decision = policy(store)
            .evaluate(&Interaction::autocomplete(1, 7, "ping"))
            .await;
        assert_eq!(decision, AccessDecision::Allowed);
    }

    #[tokio::test]
    async fn shadow_blacklist_drops_every_kind() {
        let store = Arc::new(MemoryStore::new());
        store.set_standing(7, UserStanding::ShadowBlacklisted);
        let policy = policy(store);

        for event in [
            Interaction::command(1, 7, "ping"),
            Interaction::component(2, 7, "ocr", "retry"),
            Interaction::autocomplete(3, 7, "ping"),
        ] {
            assert_eq!(
                policy.evaluate(&event).await,
                AccessDecision::DroppedSilently
            );
        }
    }

    #[tokio::test]
    async fn storage_failure_admits_the_event() {
        struct BrokenStore;

        #[async_trait]
        impl UserStore for BrokenStore {
            async fn user_standing(&self, _user_id: u64) -> StorageResult<UserStanding> {
                Err(StorageError::Unavailable("connection refused".into()))
            }
        }

        let policy = AccessPolicy::new(
            Arc::new(BrokenStore),
            Arc::new(CatalogLocalizer::with_defaults()),
        );
        let decision = policy.evaluate(&Interaction::command(1, 7, "ping")).await;
        assert_eq!(decision, AccessDecision::Allowed);
    }
}
