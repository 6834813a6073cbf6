//! Handler contract and command registry.
//!
//! A command handler is arbitrary business logic behind a uniform async
//! contract. What the pipeline knows about a command beyond its handler is
//! declared up front in [`CommandMeta`] at registration time — rate limits
//! and access flags are plain data read by the policy components, never
//! discovered reflectively from the handler itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::context::InvocationContext;
use crate::outcome::ExecutionResult;

// ============================================================================
// Handler Contract
// ============================================================================

/// The uniform contract every concrete command handler implements.
///
/// Handlers return a typed [`ExecutionResult`] instead of raising: anticipated
/// failures come back as `UserError`, and anything that still escapes (a
/// panic, a timeout) is converted to `Fault` by the dispatcher — an uncaught
/// fault never crosses this boundary upwards.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Executes the command for one interaction.
    async fn invoke(&self, ctx: InvocationContext) -> ExecutionResult;
}

/// A shared handler trait object.
pub type BoxedHandler = Arc<dyn CommandHandler>;

// ============================================================================
// Command Metadata
// ============================================================================

/// A per-command rate limit: `uses` acquisitions per `period` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Allowed acquisitions inside one window.
    pub uses: u32,
    /// Window length.
    pub period: Duration,
}

impl RateLimit {
    /// Creates a rate limit of `uses` per `period`.
    pub fn new(uses: u32, period: Duration) -> Self {
        Self { uses, period }
    }
}

/// Declarative metadata attached to a handler at registration time.
///
/// ```rust
/// use std::time::Duration;
/// use anvil_core::CommandMeta;
///
/// let meta = CommandMeta::new("ocr google", "Reads text out of an image")
///     .rate_limit(2, Duration::from_secs(20));
/// ```
#[derive(Debug, Clone)]
pub struct CommandMeta {
    /// The full command path this handler answers to (e.g. `"ocr google"`).
    pub name: String,
    /// Short human-readable description.
    pub description: String,
    /// Per-command rate limit; `None` means the pipeline default applies.
    pub rate_limit: Option<RateLimit>,
    /// Owner-only commands are registered to the owner's guild, not globally.
    pub owner_only: bool,
}

impl CommandMeta {
    /// Creates metadata for `name`.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rate_limit: None,
            owner_only: false,
        }
    }

    /// Overrides the default rate limit with `uses` per `period`.
    pub fn rate_limit(mut self, uses: u32, period: Duration) -> Self {
        self.rate_limit = Some(RateLimit::new(uses, period));
        self
    }

    /// Marks the command as owner-only.
    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }
}

// ============================================================================
// Command Registry
// ============================================================================

/// A handler together with its registration metadata.
#[derive(Clone)]
pub struct RegisteredCommand {
    meta: CommandMeta,
    handler: BoxedHandler,
}

impl RegisteredCommand {
    /// Returns the registration metadata.
    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    /// Returns the handler.
    pub fn handler(&self) -> BoxedHandler {
        Arc::clone(&self.handler)
    }
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Maps command paths to handlers.
///
/// Resolution tries the full interaction path first, then its root token, so
/// a group registered as `"ocr"` answers `"ocr google"` unless the subcommand
/// was registered on its own.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, RegisteredCommand>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `meta.name`.
    ///
    /// Re-registering a name replaces the previous handler; the last
    /// registration wins.
    pub fn register<H: CommandHandler>(&self, meta: CommandMeta, handler: H) {
        self.register_boxed(meta, Arc::new(handler));
    }

    /// Registers a pre-boxed handler.
    pub fn register_boxed(&self, meta: CommandMeta, handler: BoxedHandler) {
        let name = meta.name.clone();
        let previous = self
            .commands
            .write()
            .insert(name.clone(), RegisteredCommand { meta, handler });

        if previous.is_some() {
            warn!(command = %name, "Duplicate command registration — last registration wins");
        } else {
            debug!(command = %name, "Registered command");
        }
    }

    /// Resolves the handler for `path`, trying the full path then its root
    /// token.
    pub fn resolve(&self, path: &str) -> Option<RegisteredCommand> {
        let commands = self.commands.read();
        if let Some(command) = commands.get(path) {
            return Some(command.clone());
        }

        let root = path.split_whitespace().next()?;
        commands.get(root).cloned()
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Returns the registered command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl CommandHandler for NoopHandler {
        async fn invoke(&self, _ctx: InvocationContext) -> ExecutionResult {
            ExecutionResult::success()
        }
    }

    #[test]
    fn resolves_full_path_before_root() {
        let registry = CommandRegistry::new();
        registry.register(CommandMeta::new("ocr", "group"), NoopHandler);
        registry.register(CommandMeta::new("ocr google", "subcommand"), NoopHandler);

        let hit = registry.resolve("ocr google").unwrap();
        assert_eq!(hit.meta().name, "ocr google");

        let fallback = registry.resolve("ocr yandex").unwrap();
        assert_eq!(fallback.meta().name, "ocr");

        assert!(registry.resolve("translate").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let registry = CommandRegistry::new();
        registry.register(CommandMeta::new("ping", "first"), NoopHandler);
        registry.register(CommandMeta::new("ping", "second"), NoopHandler);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("ping").unwrap().meta().description, "second");
    }

    #[test]
    fn command_names_are_sorted() {
        let registry = CommandRegistry::new();
        registry.register(CommandMeta::new("stats", ""), NoopHandler);
        registry.register(CommandMeta::new("ping", ""), NoopHandler);

        assert_eq!(registry.command_names(), vec!["ping", "stats"]);
    }
}
