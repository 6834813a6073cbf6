//! Platform response contract.
//!
//! The connection layer implements [`Responder`]; everything above it sends
//! responses through [`deliver`], which routes between the initial-response
//! and follow-up paths so that `respond_initial` is attempted at most once
//! per interaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ResponseResult;
use crate::interaction::Interaction;

/// One outgoing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// The message text.
    pub text: String,
    /// Whether the response is visible only to the invoker.
    pub ephemeral: bool,
}

impl ResponsePayload {
    /// A response visible to everyone in the channel.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: false,
        }
    }

    /// A response visible only to the invoker.
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
        }
    }
}

/// The send/respond primitives exposed by the platform connection.
///
/// Calling [`respond_initial`](Responder::respond_initial) twice on the same
/// interaction is a caller error and a hard platform-level failure; use
/// [`deliver`] instead of calling these directly.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Sends the interaction's initial response.
    async fn respond_initial(
        &self,
        interaction: &Interaction,
        payload: &ResponsePayload,
    ) -> ResponseResult<()>;

    /// Sends a follow-up message to an already-acknowledged interaction.
    async fn respond_followup(
        &self,
        interaction: &Interaction,
        payload: &ResponsePayload,
    ) -> ResponseResult<()>;
}

/// Sends `payload`, picking the initial-response path for exactly the first
/// delivery against this interaction and the follow-up path afterwards.
pub async fn deliver(
    responder: &dyn Responder,
    interaction: &Interaction,
    payload: &ResponsePayload,
) -> ResponseResult<()> {
    if interaction.claim_initial_response() {
        responder.respond_initial(interaction, payload).await
    } else {
        responder.respond_followup(interaction, payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingResponder {
        initial: Mutex<Vec<ResponsePayload>>,
        followup: Mutex<Vec<ResponsePayload>>,
    }

    #[async_trait]
    impl Responder for RecordingResponder {
        async fn respond_initial(
            &self,
            _interaction: &Interaction,
            payload: &ResponsePayload,
        ) -> ResponseResult<()> {
            self.initial.lock().push(payload.clone());
            Ok(())
        }

        async fn respond_followup(
            &self,
            _interaction: &Interaction,
            payload: &ResponsePayload,
        ) -> ResponseResult<()> {
            self.followup.lock().push(payload.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_delivery_takes_the_followup_path() {
        let responder = Arc::new(RecordingResponder::default());
        let interaction = Interaction::command(1, 7, "ping");

        deliver(
            responder.as_ref(),
            &interaction,
            &ResponsePayload::new("pong"),
        )
        .await
        .unwrap();
        deliver(
            responder.as_ref(),
            &interaction,
            &ResponsePayload::ephemeral("again"),
        )
        .await
        .unwrap();

        assert_eq!(responder.initial.lock().len(), 1);
        assert_eq!(responder.followup.lock().len(), 1);
        assert_eq!(responder.followup.lock()[0].text, "again");
    }
}
