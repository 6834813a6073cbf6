//! # Anvil Runtime
//!
//! Runtime orchestration for the Anvil interaction pipeline.
//!
//! This crate assembles the pipeline from configuration and wires it to a
//! platform connection:
//!
//! - **Configuration**: layered figment loading (`anvil.toml`, profiles,
//!   `ANVIL_*` environment variables) with validation
//! - **Logging**: tracing-subscriber setup driven by [`config::LoggingConfig`]
//! - **Orchestration**: [`AnvilRuntime`] owning the dispatcher, handing an
//!   [`EventSink`] to the connection, and parking on shutdown signals
//!
//! The platform connection itself is a collaborator: it reads
//! [`config::GatewayConfig`] (including the advertised client identity),
//! implements [`Responder`](anvil_core::Responder), and pushes inbound
//! interactions into the sink.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{AnvilConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{AnvilRuntime, EventSink, RuntimeBuilder};
