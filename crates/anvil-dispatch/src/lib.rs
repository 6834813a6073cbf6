//! # Anvil Dispatch
//!
//! The interaction dispatch pipeline.
//!
//! This crate turns one inbound [`Interaction`](anvil_core::Interaction) into
//! exactly one visible response and one structured log record:
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌──────────────┐   ┌─────────┐
//! │ Gateway │──▶│ AccessPolicy │──▶│ RateLimiter  │──▶│ Handler │
//! └─────────┘   └──────────────┘   └──────────────┘   └────┬────┘
//!                                                          ▼
//!                              ┌──────────────┐   ┌─────────────────┐
//!                              │ UsageTracker │◀──│ OutcomeRenderer │
//!                              └──────────────┘   └─────────────────┘
//! ```
//!
//! [`Dispatcher`] orchestrates the stages; each is usable on its own:
//!
//! - [`AccessPolicy`] — allow, silently drop, or reject per stored standing
//! - [`RateLimiter`] — per-user sliding windows with per-key locking
//! - [`UsageTracker`] — serialized increment-or-create of command stats
//! - [`OutcomeRenderer`] — one response + one log record per result
//!
//! The dispatcher is cheap to clone and implements
//! `tower::Service<SharedInteraction>` for middleware composition.

pub mod access;
pub mod dispatch;
pub mod error;
pub mod rate;
pub mod render;
pub mod usage;

pub use access::{AccessDecision, AccessPolicy};
pub use dispatch::{DispatchOutcome, DispatchPolicy, Dispatcher, DispatcherBuilder};
pub use error::{SetupError, SetupResult};
pub use rate::{Clock, RateLimiter, RateScope, SystemClock};
pub use render::{OutcomeKind, OutcomeRenderer};
pub use usage::UsageTracker;
