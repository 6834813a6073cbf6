//! # Anvil
//!
//! A bot front-end with a policy-driven interaction dispatch pipeline.
//!
//! ## Overview
//!
//! Anvil receives inbound interaction events from a chat platform, decides
//! whether and how to run a matching command handler, and turns the handler's
//! outcome into exactly one user-visible response plus one structured log
//! record.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ Gateway │──▶│ AccessPolicy │──▶│ RateLimiter │──▶│    Handler    │
//! │ (sink)  │   └──────────────┘   └─────────────┘   │  (own task)   │
//! └─────────┘                                        └───────┬───────┘
//!                          ┌──────────────┐   ┌──────────────▼──────┐
//!                          │ UsageTracker │◀──│   OutcomeRenderer   │
//!                          └──────────────┘   └─────────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, owns the dispatcher, parks on signals
//! - **Dispatcher**: runs the pipeline once per event, each on its own task
//! - **Handlers**: user-defined async command logic behind a uniform contract
//! - **Collaborators**: persistence, localization, and the platform
//!   connection plug in through `anvil-core` traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use anvil::prelude::*;
//!
//! struct PingHandler;
//!
//! #[async_trait::async_trait]
//! impl CommandHandler for PingHandler {
//!     async fn invoke(&self, ctx: InvocationContext) -> ExecutionResult {
//!         if let Err(error) = ctx.reply("pong").await {
//!             return ExecutionResult::fault(error.to_string());
//!         }
//!         ExecutionResult::success()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = AnvilRuntime::builder()
//!         .with_current_dir()
//!         .users(store.clone())
//!         .usage(store)
//!         .responder(responder)
//!         .build()?;
//!
//!     runtime.register_command(CommandMeta::new("ping", "Replies with pong"), PingHandler);
//!
//!     connection.attach(runtime.event_sink());
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use anvil_core as core;
pub use anvil_dispatch as dispatch;
pub use anvil_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use anvil::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use anvil_runtime::{AnvilRuntime, EventSink};

    // Pipeline - for embedding the dispatcher directly
    pub use anvil_dispatch::{DispatchOutcome, DispatchPolicy, Dispatcher, OutcomeKind, RateScope};

    // Handler surface
    pub use anvil_core::{
        CommandHandler, CommandMeta, CommandRegistry, ExecutionResult, InvocationContext,
        RateLimit,
    };

    // Event model
    pub use anvil_core::{Interaction, InteractionKind, SharedInteraction};

    // Collaborator contracts
    pub use anvil_core::{
        Localizer, MemoryStore, Responder, ResponsePayload, UsageStore, UserStanding, UserStore,
    };
}
