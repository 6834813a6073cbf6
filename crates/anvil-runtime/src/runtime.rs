//! Runtime orchestration.
//!
//! [`AnvilRuntime`] wires the dispatch pipeline to a platform connection: the
//! connection pushes inbound interactions into the runtime's [`EventSink`],
//! and every event gets its own task so a slow handler never holds up the
//! connection's receive loop or unrelated events.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use anvil_runtime::AnvilRuntime;
//!
//! let runtime = AnvilRuntime::builder()
//!     .with_current_dir()
//!     .users(store.clone())
//!     .usage(store)
//!     .responder(responder)
//!     .build()?;
//!
//! runtime.register_command(CommandMeta::new("ping", "Replies with pong"), PingHandler);
//!
//! let sink = runtime.event_sink();   // hand this to the connection
//! runtime.run().await?;              // parks until Ctrl+C / SIGTERM
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use anvil_core::handler::{CommandHandler, CommandMeta, CommandRegistry};
use anvil_core::interaction::SharedInteraction;
use anvil_core::locale::Localizer;
use anvil_core::respond::Responder;
use anvil_core::store::{UsageStore, UserStore};
use anvil_dispatch::Dispatcher;

use crate::config::{AnvilConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Where the platform connection delivers inbound interactions.
///
/// Calling the sink never blocks on dispatch: each event is handed to its own
/// task, mirroring a connection layer that must keep reading from the socket.
pub type EventSink = Arc<dyn Fn(SharedInteraction) + Send + Sync>;

/// The runtime that owns the dispatch pipeline.
pub struct AnvilRuntime {
    config: AnvilConfig,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
}

impl AnvilRuntime {
    /// Returns a builder for assembling a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &AnvilConfig {
        &self.config
    }

    /// Returns the dispatcher (cheap clone, shares all state).
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Returns the command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.dispatcher.registry()
    }

    /// Registers a command handler.
    pub fn register_command<H: CommandHandler>(&self, meta: CommandMeta, handler: H) {
        self.registry().register(meta, handler);
    }

    /// Returns the sink the platform connection delivers events into.
    ///
    /// Each delivered interaction is dispatched on its own task.
    pub fn event_sink(&self) -> EventSink {
        let dispatcher = self.dispatcher.clone();
        Arc::new(move |interaction: SharedInteraction| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(interaction).await;
            });
        })
    }

    /// Returns a token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until a shutdown signal arrives or the shutdown token is
    /// cancelled.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!(
            commands = self.registry().len(),
            "Anvil runtime is now running. Press Ctrl+C to stop."
        );

        self.wait_for_shutdown().await;

        info!("Runtime stopped");
        Ok(())
    }

    /// Runs until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        info!(commands = self.registry().len(), "Anvil runtime is now running");
        shutdown.await;
        info!("Runtime stopped");
        Ok(())
    }

    /// Waits for Ctrl+C, SIGTERM, or token cancellation.
    async fn wait_for_shutdown(&self) {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to register SIGTERM handler");

            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                }
                _ = self.shutdown.cancelled() => {
                    debug!("Shutdown token cancelled");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                }
                _ = self.shutdown.cancelled() => {
                    debug!("Shutdown token cancelled");
                }
            }
        }

        // Tell everything holding a child token to wind down too.
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for AnvilRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnvilRuntime")
            .field("commands", &self.registry().len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for an [`AnvilRuntime`].
///
/// Configuration comes either from the layered loader (files + `ANVIL_*` env)
/// or a pre-built [`AnvilConfig`]; the persistence stores and the platform
/// responder are required collaborators.
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    config: Option<AnvilConfig>,
    registry: Option<Arc<CommandRegistry>>,
    users: Option<Arc<dyn UserStore>>,
    usage: Option<Arc<dyn UsageStore>>,
    responder: Option<Arc<dyn Responder>>,
    localizer: Option<Arc<dyn Localizer>>,
}

impl RuntimeBuilder {
    /// Creates a builder with an empty configuration loader.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            config: None,
            registry: None,
            users: None,
            usage: None,
            responder: None,
            localizer: None,
        }
    }

    /// Loads configuration from a specific file.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. `"production"`).
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Searches the current directory for `anvil.*` configuration files.
    pub fn with_current_dir(mut self) -> Self {
        self.loader = self.loader.with_current_dir();
        self
    }

    /// Searches the user configuration directory.
    pub fn with_user_dir(mut self) -> Self {
        self.loader = self.loader.with_user_dir();
        self
    }

    /// Enables `ANVIL_*` environment variable overrides (the default).
    pub fn with_env(mut self) -> Self {
        self.loader = self.loader.with_env();
        self
    }

    /// Disables `ANVIL_*` environment variable overrides.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Uses a pre-built configuration instead of the loader.
    pub fn config(mut self, config: AnvilConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses an existing command registry instead of a fresh one.
    pub fn registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the user-standing store (required).
    pub fn users(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = Some(users);
        self
    }

    /// Sets the usage-counter store (required).
    pub fn usage(mut self, usage: Arc<dyn UsageStore>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Sets the platform responder (required).
    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Overrides the default localizer.
    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// Loads and validates configuration, initializes logging, and
    /// assembles the runtime.
    pub fn build(self) -> RuntimeResult<AnvilRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.loader.load()?,
        };
        validate_config(&config)?;

        logging::init_from_config(&config.logging);

        let mut dispatcher = Dispatcher::builder().policy(config.dispatch.to_policy());
        if let Some(registry) = self.registry {
            dispatcher = dispatcher.registry(registry);
        }
        if let Some(users) = self.users {
            dispatcher = dispatcher.users(users);
        }
        if let Some(usage) = self.usage {
            dispatcher = dispatcher.usage(usage);
        }
        if let Some(responder) = self.responder {
            dispatcher = dispatcher.responder(responder);
        }
        if let Some(localizer) = self.localizer {
            dispatcher = dispatcher.localizer(localizer);
        }

        let dispatcher = dispatcher.build()?;

        info!(
            log_level = config.logging.level.as_str(),
            rate_limit_uses = config.dispatch.rate_limit_uses,
            rate_limit_period_secs = config.dispatch.rate_limit_period_secs,
            "Runtime initialized from configuration"
        );

        Ok(AnvilRuntime {
            config,
            dispatcher,
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
