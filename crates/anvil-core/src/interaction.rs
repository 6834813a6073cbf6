//! Inbound interaction model.
//!
//! This module provides the event side of the pipeline:
//!
//! - [`InteractionKind`] - interaction classification (command, component, autocomplete)
//! - [`Interaction`] - one inbound platform event, alive for a single dispatch cycle
//!
//! An [`Interaction`] is created by the platform connection and handed to the
//! dispatcher. Apart from the acknowledged flag (set once the initial response
//! goes out) it is immutable, and it is discarded when the dispatch cycle ends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

// ============================================================================
// Interaction Classification
// ============================================================================

/// Classification of inbound interactions.
///
/// This is the high-level category the access policy and the renderer branch
/// on; the concrete command is identified separately by [`Interaction::command_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// A slash or context command invocation.
    Command,
    /// A press on an interactive component (button, select menu).
    Component,
    /// An autocomplete query for a command option.
    Autocomplete,
}

impl InteractionKind {
    /// Returns `true` for kinds whose outcome is delivered back to the user
    /// (commands and component presses). Autocomplete queries answer through
    /// their own suggestion channel and never receive error responses.
    pub fn interactive(self) -> bool {
        matches!(self, Self::Command | Self::Component)
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Command => "command",
            Self::Component => "component",
            Self::Autocomplete => "autocomplete",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Interaction
// ============================================================================

/// One inbound request from the chat platform.
///
/// Constructed with [`Interaction::command`], [`Interaction::component`] or
/// [`Interaction::autocomplete`] plus the `with_*` builder methods:
///
/// ```rust
/// use anvil_core::Interaction;
///
/// let event = Interaction::command(1, 42, "ocr google")
///     .with_guild(99)
///     .with_locale("es-ES");
/// assert_eq!(event.root_command(), "ocr");
/// assert!(!event.has_responded());
/// ```
#[derive(Debug)]
pub struct Interaction {
    id: u64,
    kind: InteractionKind,
    user_id: u64,
    guild_id: Option<u64>,
    command_path: String,
    component_id: Option<String>,
    options: Value,
    locale: Option<String>,
    /// Set once the initial response slot is claimed; never cleared.
    acknowledged: AtomicBool,
}

impl Interaction {
    fn new(id: u64, kind: InteractionKind, user_id: u64, command_path: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            user_id,
            guild_id: None,
            command_path: command_path.into(),
            component_id: None,
            options: Value::Null,
            locale: None,
            acknowledged: AtomicBool::new(false),
        }
    }

    /// Creates a command invocation.
    pub fn command(id: u64, user_id: u64, command_path: impl Into<String>) -> Self {
        Self::new(id, InteractionKind::Command, user_id, command_path)
    }

    /// Creates a component press belonging to `command_path`.
    pub fn component(
        id: u64,
        user_id: u64,
        command_path: impl Into<String>,
        component_id: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(id, InteractionKind::Component, user_id, command_path);
        event.component_id = Some(component_id.into());
        event
    }

    /// Creates an autocomplete query for `command_path`.
    pub fn autocomplete(id: u64, user_id: u64, command_path: impl Into<String>) -> Self {
        Self::new(id, InteractionKind::Autocomplete, user_id, command_path)
    }

    /// Sets the guild this interaction was invoked from.
    pub fn with_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Sets the raw option payload delivered by the platform.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Sets the invoker's locale (e.g. `"es-ES"`).
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Returns the platform-assigned interaction ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the interaction classification.
    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    /// Returns the invoking user's ID.
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Returns the guild the interaction was invoked from, if any.
    pub fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    /// Returns the full command path (e.g. `"ocr google"`).
    pub fn command_path(&self) -> &str {
        &self.command_path
    }

    /// Returns the root token of the command path (`"ocr"` for `"ocr google"`).
    pub fn root_command(&self) -> &str {
        self.command_path
            .split_whitespace()
            .next()
            .unwrap_or(&self.command_path)
    }

    /// Returns the component custom ID for component presses.
    pub fn component_id(&self) -> Option<&str> {
        self.component_id.as_deref()
    }

    /// Returns the raw option payload.
    pub fn options(&self) -> &Value {
        &self.options
    }

    /// Returns the invoker's locale, if the platform supplied one.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Returns a short descriptor of where the interaction happened,
    /// for log records.
    pub fn context_display(&self) -> String {
        match self.guild_id {
            Some(guild) => format!("guild {guild}"),
            None => "DM".to_string(),
        }
    }

    /// Returns `true` once the initial response slot has been claimed.
    pub fn has_responded(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Claims the initial response slot.
    ///
    /// Returns `true` for exactly one caller per interaction; everyone else
    /// must deliver through the follow-up path. The slot stays claimed even
    /// if delivery subsequently fails — delivery errors are terminal for the
    /// event and never retried through the initial path.
    pub fn claim_initial_response(&self) -> bool {
        !self.acknowledged.swap(true, Ordering::SeqCst)
    }
}

/// A shared interaction handle.
pub type SharedInteraction = Arc<Interaction>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_response_slot_is_claimed_once() {
        let event = Interaction::command(1, 7, "ping");
        assert!(!event.has_responded());
        assert!(event.claim_initial_response());
        assert!(!event.claim_initial_response());
        assert!(event.has_responded());
    }

    #[test]
    fn root_command_is_first_token() {
        let event = Interaction::command(1, 7, "ocr google");
        assert_eq!(event.root_command(), "ocr");
        assert_eq!(event.command_path(), "ocr google");

        let bare = Interaction::command(2, 7, "ping");
        assert_eq!(bare.root_command(), "ping");
    }

    #[test]
    fn context_display_distinguishes_guild_and_dm() {
        let dm = Interaction::command(1, 7, "ping");
        assert_eq!(dm.context_display(), "DM");

        let guild = Interaction::command(2, 7, "ping").with_guild(42);
        assert_eq!(guild.context_display(), "guild 42");
    }

    #[test]
    fn autocomplete_is_not_interactive() {
        assert!(InteractionKind::Command.interactive());
        assert!(InteractionKind::Component.interactive());
        assert!(!InteractionKind::Autocomplete.interactive());
    }
}
