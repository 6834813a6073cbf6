//! Invocation context handed to handlers.
//!
//! One [`InvocationContext`] is created per dispatch cycle and owned by that
//! cycle's handler. It bundles the interaction with the collaborators a
//! handler needs to answer: the platform responder and the localizer.
//! The `reply*` helpers share the exactly-once initial-response routing with
//! the outcome renderer, so a handler can never acknowledge an interaction
//! twice through the initial path.

use std::sync::Arc;

use crate::error::ResponseResult;
use crate::interaction::{Interaction, SharedInteraction};
use crate::locale::{DEFAULT_CULTURE, Localizer};
use crate::respond::{Responder, ResponsePayload, deliver};

/// Everything a handler needs to execute one interaction.
#[derive(Clone)]
pub struct InvocationContext {
    interaction: SharedInteraction,
    responder: Arc<dyn Responder>,
    localizer: Arc<dyn Localizer>,
}

impl InvocationContext {
    /// Creates a context for one dispatch cycle.
    pub fn new(
        interaction: SharedInteraction,
        responder: Arc<dyn Responder>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            interaction,
            responder,
            localizer,
        }
    }

    /// Returns the interaction being handled.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Returns a clone of the shared interaction handle.
    pub fn interaction_arc(&self) -> SharedInteraction {
        Arc::clone(&self.interaction)
    }

    /// Returns the platform responder.
    pub fn responder(&self) -> Arc<dyn Responder> {
        Arc::clone(&self.responder)
    }

    /// Returns the invoker's resolved culture.
    pub fn culture(&self) -> &str {
        self.interaction.locale().unwrap_or(DEFAULT_CULTURE)
    }

    /// Resolves `key` for the invoker's culture.
    pub fn localize(&self, key: &str, args: &[&str]) -> String {
        self.localizer.localize(key, self.culture(), args)
    }

    /// Sends a response visible to the whole channel.
    pub async fn reply(&self, text: impl Into<String>) -> ResponseResult<()> {
        self.send(&ResponsePayload::new(text)).await
    }

    /// Sends a response visible only to the invoker.
    pub async fn reply_ephemeral(&self, text: impl Into<String>) -> ResponseResult<()> {
        self.send(&ResponsePayload::ephemeral(text)).await
    }

    /// Sends `payload`, routing initial-vs-followup exactly once.
    pub async fn send(&self, payload: &ResponsePayload) -> ResponseResult<()> {
        deliver(self.responder.as_ref(), &self.interaction, payload).await
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("interaction", &self.interaction)
            .finish_non_exhaustive()
    }
}
