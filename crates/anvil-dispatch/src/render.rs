//! Outcome rendering.
//!
//! Converts one [`ExecutionResult`] into the single user-visible response for
//! the interaction plus one structured log record. Response delivery goes
//! through [`deliver`](anvil_core::respond::deliver), which routes between
//! the initial-response and follow-up paths off the interaction's
//! acknowledged flag — the initial path is never attempted twice.
//!
//! Autocomplete queries are the exception to "one visible response": their
//! result is the suggestion list the handler already delivered, so failed
//! autocomplete executions are logged and never answered.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use anvil_core::interaction::Interaction;
use anvil_core::locale::{DEFAULT_CULTURE, Localizer, keys};
use anvil_core::outcome::{ExecutionResult, UserError};
use anvil_core::respond::{Responder, ResponsePayload, deliver};

/// The terminal classification of one dispatch, as logged and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// The handler completed normally.
    Success,
    /// An anticipated user error was answered.
    UserError,
    /// An anticipated user error was suppressed (silent, or autocomplete).
    Suppressed,
    /// An unexpected fault was answered with the generic error message.
    Fault,
}

/// Renders execution results into responses and log records.
pub struct OutcomeRenderer {
    responder: Arc<dyn Responder>,
    localizer: Arc<dyn Localizer>,
}

impl OutcomeRenderer {
    /// Creates a renderer sending through `responder`.
    pub fn new(responder: Arc<dyn Responder>, localizer: Arc<dyn Localizer>) -> Self {
        Self {
            responder,
            localizer,
        }
    }

    /// Consumes `result`, sends at most one response, and emits one log
    /// record carrying the command, the invoking user, and the context
    /// descriptor.
    pub async fn render(
        &self,
        result: ExecutionResult,
        interaction: &Interaction,
        command: &str,
    ) -> OutcomeKind {
        let user_id = interaction.user_id();
        let context = interaction.context_display();
        let kind = interaction.kind();

        match result {
            ExecutionResult::Success => {
                if kind.interactive() {
                    info!(
                        command,
                        user_id,
                        %context,
                        outcome = "success",
                        "Executed {kind} \"{command}\""
                    );
                } else {
                    debug!(
                        command,
                        user_id,
                        %context,
                        outcome = "success",
                        "Executed autocomplete handler of \"{command}\""
                    );
                }
                OutcomeKind::Success
            }
            ExecutionResult::UserError(user_error) if user_error.silent => {
                // Another path already delivered a result for this trigger.
                debug!(
                    command,
                    user_id,
                    %context,
                    outcome = "user-error",
                    detail = %user_error.message,
                    "Suppressed silent error of \"{command}\""
                );
                OutcomeKind::Suppressed
            }
            ExecutionResult::UserError(user_error) => {
                info!(
                    command,
                    user_id,
                    %context,
                    outcome = "user-error",
                    detail = %user_error.message,
                    "Unsuccessful execution of {kind} \"{command}\""
                );

                if !kind.interactive() {
                    return OutcomeKind::Suppressed;
                }

                self.answer(interaction, &payload_for(&user_error)).await;
                OutcomeKind::UserError
            }
            ExecutionResult::Fault(cause) => {
                error!(
                    command,
                    user_id,
                    %context,
                    outcome = "fault",
                    detail = %cause,
                    "Failed to execute {kind} \"{command}\" due to an unexpected error"
                );

                if !kind.interactive() {
                    return OutcomeKind::Fault;
                }

                let culture = interaction.locale().unwrap_or(DEFAULT_CULTURE);
                let headline = self.localizer.localize(keys::ERROR_OCCURRED, culture, &[]);
                let detail =
                    self.localizer
                        .localize(keys::ERROR_DETAIL, culture, &[&cause.to_string()]);

                self.answer(
                    interaction,
                    &ResponsePayload::ephemeral(format!("{headline}\n\n{detail}")),
                )
                .await;
                OutcomeKind::Fault
            }
        }
    }

    /// Delivers one response; a platform rejection is terminal for the event
    /// and only logged.
    async fn answer(&self, interaction: &Interaction, payload: &ResponsePayload) {
        if let Err(error) = deliver(self.responder.as_ref(), interaction, payload).await {
            warn!(
                interaction_id = interaction.id(),
                %error,
                "Platform rejected the outgoing response"
            );
        }
    }
}

impl std::fmt::Debug for OutcomeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeRenderer").finish_non_exhaustive()
    }
}

fn payload_for(user_error: &UserError) -> ResponsePayload {
    ResponsePayload {
        text: user_error.message.clone(),
        ephemeral: user_error.ephemeral,
    }
}
