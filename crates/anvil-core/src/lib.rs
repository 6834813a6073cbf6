//! # Anvil Core
//!
//! Core contracts for the Anvil interaction pipeline.
//!
//! This crate defines the types the pipeline and the embedding application
//! agree on, without any pipeline logic of its own:
//!
//! - **Event model**: one [`Interaction`] per inbound platform event
//!   ([`InteractionKind`], the acknowledged flag, context descriptors)
//! - **Handler contract**: [`CommandHandler`] with declarative
//!   [`CommandMeta`], resolved through the [`CommandRegistry`]
//! - **Typed results**: [`ExecutionResult`] (success / user error / fault)
//! - **Collaborator seams**: persistence ([`UserStore`], [`UsageStore`]),
//!   localization ([`Localizer`]), and platform responses ([`Responder`])
//!
//! The dispatch pipeline itself lives in `anvil-dispatch`; configuration and
//! runtime orchestration live in `anvil-runtime`.

pub mod context;
pub mod error;
pub mod handler;
pub mod interaction;
pub mod locale;
pub mod outcome;
pub mod respond;
pub mod store;

pub use context::InvocationContext;
pub use error::{ResponseError, ResponseResult, StorageError, StorageResult};
pub use handler::{
    BoxedHandler, CommandHandler, CommandMeta, CommandRegistry, RateLimit, RegisteredCommand,
};
pub use interaction::{Interaction, InteractionKind, SharedInteraction};
pub use locale::{CatalogLocalizer, DEFAULT_CULTURE, Localizer, keys};
pub use outcome::{ExecutionResult, FaultCause, UserError};
pub use respond::{Responder, ResponsePayload, deliver};
pub use store::{MemoryStore, UsageStore, UserStanding, UserStore};

/// Prelude for common imports.
pub mod prelude {
    pub use super::context::InvocationContext;
    pub use super::handler::{CommandHandler, CommandMeta, CommandRegistry, RateLimit};
    pub use super::interaction::{Interaction, InteractionKind};
    pub use super::outcome::ExecutionResult;
    pub use super::respond::{Responder, ResponsePayload};
    pub use super::store::{UsageStore, UserStanding, UserStore};
}
