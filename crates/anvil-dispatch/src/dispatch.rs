//! The interaction dispatcher.
//!
//! [`Dispatcher`] orchestrates the pipeline for one inbound interaction:
//!
//! 1. The access policy admits, silently drops, or rejects the event
//! 2. The registry resolves the handler; unknown commands short-circuit to a
//!    user error
//! 3. The rate limiter admits or denies without invoking the handler
//! 4. The handler runs on its own task under a timeout; panics and timeouts
//!    come back as `Fault` — a handler defect never crashes the dispatcher
//! 5. Usage is recorded for the executed command, then the outcome renderer
//!    emits the single response and log record
//!
//! Each interaction is expected to be dispatched on its own task (the runtime
//! spawns one per event), so a slow handler never blocks unrelated events.
//! The shared pieces — the rate limiter's window table and the usage
//! tracker's critical section — carry their own synchronization.
//!
//! # Tower Service Integration
//!
//! `Dispatcher` is cheaply cloneable and implements
//! `tower::Service<SharedInteraction>`, so gateway integrations can wrap it
//! in middleware:
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(64)
//!     .service(dispatcher.clone());
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::task::JoinError;
use tower::Service;
use tracing::{Instrument, Level, debug, span, warn};

use anvil_core::context::InvocationContext;
use anvil_core::handler::{CommandRegistry, RateLimit, RegisteredCommand};
use anvil_core::interaction::SharedInteraction;
use anvil_core::locale::{CatalogLocalizer, DEFAULT_CULTURE, Localizer, keys};
use anvil_core::outcome::ExecutionResult;
use anvil_core::respond::{Responder, ResponsePayload, deliver};
use anvil_core::store::{UsageStore, UserStore};

use crate::access::{AccessDecision, AccessPolicy};
use crate::error::{SetupError, SetupResult};
use crate::rate::{Clock, RateLimiter, RateScope, SystemClock};
use crate::render::{OutcomeKind, OutcomeRenderer};
use crate::usage::UsageTracker;

// ============================================================================
// Policy knobs
// ============================================================================

/// Pipeline-wide dispatch settings.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Rate limit applied to commands without their own
    /// [`CommandMeta::rate_limit`](anvil_core::CommandMeta).
    pub default_rate_limit: RateLimit,
    /// How rate buckets are keyed for component presses.
    pub rate_scope: RateScope,
    /// Upper bound on one handler execution; an elapsed timeout becomes a
    /// `Fault` outcome.
    pub handler_timeout: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            default_rate_limit: RateLimit::new(5, Duration::from_secs(10)),
            rate_scope: RateScope::default(),
            handler_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Dispatch outcome
// ============================================================================

/// The terminal state of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Silently dropped by the access policy: no response, no usage
    /// mutation.
    Dropped,
    /// Rejected by the access policy after one rejection response.
    Rejected,
    /// The pipeline ran to completion and the renderer classified the
    /// result.
    Completed {
        /// The resolved command name (the raw path when resolution failed).
        command: String,
        /// The rendered outcome.
        outcome: OutcomeKind,
    },
}

// ============================================================================
// Dispatcher
// ============================================================================

struct DispatcherInner {
    registry: Arc<CommandRegistry>,
    access: AccessPolicy,
    limiter: RateLimiter,
    usage: UsageTracker,
    renderer: OutcomeRenderer,
    responder: Arc<dyn Responder>,
    localizer: Arc<dyn Localizer>,
    policy: DispatchPolicy,
}

/// The pipeline orchestrator.
///
/// Cheap to clone; all clones share the same window table, usage critical
/// section, and registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Creates a dispatcher with default policy, clock, and localization.
    pub fn new(
        registry: Arc<CommandRegistry>,
        users: Arc<dyn UserStore>,
        usage: Arc<dyn UsageStore>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        let localizer: Arc<dyn Localizer> = Arc::new(CatalogLocalizer::with_defaults());
        Self::assemble(
            registry,
            users,
            usage,
            responder,
            localizer,
            DispatchPolicy::default(),
            Arc::new(SystemClock),
        )
    }

    /// Returns a builder for full control over collaborators and policy.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    fn assemble(
        registry: Arc<CommandRegistry>,
        users: Arc<dyn UserStore>,
        usage: Arc<dyn UsageStore>,
        responder: Arc<dyn Responder>,
        localizer: Arc<dyn Localizer>,
        policy: DispatchPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                access: AccessPolicy::new(users, Arc::clone(&localizer)),
                limiter: RateLimiter::with_clock(clock),
                usage: UsageTracker::new(usage),
                renderer: OutcomeRenderer::new(Arc::clone(&responder), Arc::clone(&localizer)),
                responder,
                localizer,
                policy,
            }),
        }
    }

    /// Returns the command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.inner.registry
    }

    /// Runs the full pipeline for one interaction.
    pub async fn dispatch(&self, interaction: SharedInteraction) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            interaction_id = interaction.id(),
            kind = %interaction.kind(),
            command = %interaction.command_path()
        );
        self.run(interaction).instrument(span).await
    }

    async fn run(&self, interaction: SharedInteraction) -> DispatchOutcome {
        let this = &self.inner;

        // Received → AccessChecked (or short-circuit to Dropped/Rejected).
        match this.access.evaluate(&interaction).await {
            AccessDecision::Allowed => {}
            AccessDecision::DroppedSilently => return DispatchOutcome::Dropped,
            AccessDecision::Rejected { message } => {
                if let Err(error) = deliver(
                    this.responder.as_ref(),
                    &interaction,
                    &ResponsePayload::ephemeral(message),
                )
                .await
                {
                    warn!(
                        interaction_id = interaction.id(),
                        %error,
                        "Failed to deliver rejection response"
                    );
                }
                return DispatchOutcome::Rejected;
            }
        }

        // AccessChecked → RateChecked requires a resolved handler.
        let culture = interaction.locale().unwrap_or(DEFAULT_CULTURE);
        let Some(command) = this.registry.resolve(interaction.command_path()) else {
            let message = this.localizer.localize(
                keys::COMMAND_NOT_FOUND,
                culture,
                &[interaction.command_path()],
            );
            let outcome = this
                .renderer
                .render(
                    ExecutionResult::ephemeral_error(message),
                    &interaction,
                    interaction.command_path(),
                )
                .await;
            return DispatchOutcome::Completed {
                command: interaction.command_path().to_string(),
                outcome,
            };
        };

        let name = command.meta().name.clone();

        // RateChecked → Executing, unless the window is spent.
        if !self.admit(&command, &interaction) {
            debug!(command = %name, user_id = interaction.user_id(), "Rate limit exceeded");
            let message = this.localizer.localize(keys::RATE_LIMITED, culture, &[]);
            let outcome = this
                .renderer
                .render(ExecutionResult::ephemeral_error(message), &interaction, &name)
                .await;
            return DispatchOutcome::Completed {
                command: name,
                outcome,
            };
        }

        // Executing → ResultReady. The handler runs on its own task so a
        // panic unwinds there, and under the timeout policy.
        let result = self.execute(&command, &interaction, &name).await;

        // ResultReady → Responded: record usage for the executed command,
        // then render. Autocomplete answers through its own suggestion
        // channel and is excluded from command stats.
        if interaction.kind().interactive() {
            this.usage.record_invocation(&name).await;
        }

        let outcome = this.renderer.render(result, &interaction, &name).await;
        DispatchOutcome::Completed {
            command: name,
            outcome,
        }
    }

    fn admit(&self, command: &RegisteredCommand, interaction: &SharedInteraction) -> bool {
        let this = &self.inner;
        let limit = command
            .meta()
            .rate_limit
            .unwrap_or(this.policy.default_rate_limit);
        let bucket = this
            .policy
            .rate_scope
            .bucket(&command.meta().name, interaction.component_id());

        this.limiter
            .try_acquire(interaction.user_id(), &bucket, limit.uses, limit.period)
    }

    async fn execute(
        &self,
        command: &RegisteredCommand,
        interaction: &SharedInteraction,
        name: &str,
    ) -> ExecutionResult {
        let this = &self.inner;
        let ctx = InvocationContext::new(
            Arc::clone(interaction),
            Arc::clone(&this.responder),
            Arc::clone(&this.localizer),
        );

        let handler = command.handler();
        let mut task = tokio::spawn(async move { handler.invoke(ctx).await });

        let finished = tokio::time::timeout(this.policy.handler_timeout, &mut task).await;
        match finished {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                ExecutionResult::fault(format!(
                    "handler for \"{name}\" {}",
                    panic_detail(join_error)
                ))
            }
            Err(_elapsed) => {
                task.abort();
                ExecutionResult::fault(format!(
                    "handler for \"{name}\" timed out after {:?}",
                    this.policy.handler_timeout
                ))
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.inner.registry.len())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

fn panic_detail(error: JoinError) -> String {
    if error.is_panic() {
        let payload = error.into_panic();
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "opaque panic payload".to_string()
        };
        format!("panicked: {message}")
    } else {
        "was cancelled".to_string()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<SharedInteraction> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, interaction: SharedInteraction) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(interaction).await) })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for a [`Dispatcher`] with custom collaborators.
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder()
///     .registry(registry)
///     .users(store.clone())
///     .usage(store)
///     .responder(responder)
///     .policy(policy)
///     .build()?;
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: Option<Arc<CommandRegistry>>,
    users: Option<Arc<dyn UserStore>>,
    usage: Option<Arc<dyn UsageStore>>,
    responder: Option<Arc<dyn Responder>>,
    localizer: Option<Arc<dyn Localizer>>,
    policy: DispatchPolicy,
    clock: Option<Arc<dyn Clock>>,
}

impl DispatcherBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command registry. A fresh empty registry is used if omitted.
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

    /// Overrides the default dispatch policy.
    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the clock used for rate windows.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::MissingCollaborator`] when a required
    /// collaborator was never supplied.
    pub fn build(self) -> SetupResult<Dispatcher> {
        let users = self
            .users
            .ok_or(SetupError::MissingCollaborator("user store"))?;
        let usage = self
            .usage
            .ok_or(SetupError::MissingCollaborator("usage store"))?;
        let responder = self
            .responder
            .ok_or(SetupError::MissingCollaborator("responder"))?;

        let registry = self.registry.unwrap_or_default();
        let localizer = self
            .localizer
            .unwrap_or_else(|| Arc::new(CatalogLocalizer::with_defaults()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(Dispatcher::assemble(
            registry, users, usage, responder, localizer, self.policy, clock,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::future::join_all;
    use parking_lot::Mutex;
    use tokio_test::assert_ok;
    use tower::ServiceExt;

    use anvil_core::error::ResponseResult;
    use anvil_core::handler::{CommandHandler, CommandMeta};
    use anvil_core::interaction::Interaction;
    use anvil_core::store::{MemoryStore, UserStanding};

    #[derive(Default)]
    struct RecordingResponder {
        initial: Mutex<Vec<ResponsePayload>>,
        followup: Mutex<Vec<ResponsePayload>>,
    }

    impl RecordingResponder {
        fn total(&self) -> usize {
            self.initial.lock().len() + self.followup.lock().len()
        }
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

    #[derive(Default)]
    struct CountingHandler {
        invocations: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for CountingHandler {
        async fn invoke(&self, _ctx: InvocationContext) -> ExecutionResult {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            ExecutionResult::success()
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl CommandHandler for PanickingHandler {
        async fn invoke(&self, _ctx: InvocationContext) -> ExecutionResult {
            panic!("ocr backend exploded");
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl CommandHandler for SlowHandler {
        async fn invoke(&self, _ctx: InvocationContext) -> ExecutionResult {
            tokio::time::sleep(Duration::from_secs(600)).await;
            ExecutionResult::success()
        }
    }

    /// Replies mid-execution, then fails: the error must take the follow-up
    /// path.
    struct ReplyThenFailHandler;

    #[async_trait]
    impl CommandHandler for ReplyThenFailHandler {
        async fn invoke(&self, ctx: InvocationContext) -> ExecutionResult {
            if let Err(error) = ctx.reply("partial result").await {
                return ExecutionResult::fault(error.to_string());
            }
            ExecutionResult::user_error("second stage failed")
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        responder: Arc<RecordingResponder>,
        dispatcher: Dispatcher,
    }

    fn fixture_with_policy(policy: DispatchPolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let responder = Arc::new(RecordingResponder::default());
        let dispatcher = Dispatcher::builder()
            .users(store.clone())
            .usage(store.clone())
            .responder(responder.clone())
            .policy(policy)
            .build()
            .expect("all collaborators supplied");

        Fixture {
            store,
            responder,
            dispatcher,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_policy(DispatchPolicy {
            // Wide default so only per-command limits bite in tests.
            default_rate_limit: RateLimit::new(1000, Duration::from_secs(60)),
            ..DispatchPolicy::default()
        })
    }

    #[tokio::test]
    async fn blacklisted_user_gets_one_rejection_and_no_handler_run() {
        let fx = fixture();
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher
            .registry()
            .register_boxed(CommandMeta::new("ocr google", ""), handler.clone());
        fx.store.set_standing(
            2,
            UserStanding::Blacklisted {
                reason: Some("spam".into()),
            },
        );

        let outcome = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "ocr google")))
            .await;

        assert_eq!(outcome, DispatchOutcome::Rejected);
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(fx.store.usage("ocr google").await.unwrap(), None);

        let initial = fx.responder.initial.lock();
        assert_eq!(initial.len(), 1);
        assert!(initial[0].text.contains("spam"), "text: {}", initial[0].text);
        assert!(initial[0].ephemeral);
    }

    #[tokio::test]
    async fn shadow_blacklisted_user_observes_nothing() {
        let fx = fixture();
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher
            .registry()
            .register_boxed(CommandMeta::new("ping", ""), handler.clone());
        fx.store.set_standing(2, UserStanding::ShadowBlacklisted);

        for event in [
            Interaction::command(1, 2, "ping"),
            Interaction::component(2, 2, "ping", "again"),
            Interaction::autocomplete(3, 2, "ping"),
        ] {
            let outcome = fx.dispatcher.dispatch(Arc::new(event)).await;
            assert_eq!(outcome, DispatchOutcome::Dropped);
        }

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(fx.responder.total(), 0);
        assert_eq!(fx.store.usage("ping").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_command_reports_a_user_error() {
        let fx = fixture();

        let outcome = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "translate")))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: "translate".into(),
                outcome: OutcomeKind::UserError,
            }
        );
        let initial = fx.responder.initial.lock();
        assert_eq!(initial.len(), 1);
        assert!(initial[0].text.contains("translate"));
        // Never-resolved commands must not create usage records.
        assert_eq!(fx.store.usage("translate").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rate_limited_call_skips_handler_and_usage() {
        // The "ocr google" scenario: limit 2 per window, 3 calls.
        let fx = fixture();
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher.registry().register_boxed(
            CommandMeta::new("ocr google", "").rate_limit(2, Duration::from_secs(60)),
            handler.clone(),
        );

        for id in 1..=2 {
            let outcome = fx
                .dispatcher
                .dispatch(Arc::new(Interaction::command(id, 2, "ocr google")))
                .await;
            assert_eq!(
                outcome,
                DispatchOutcome::Completed {
                    command: "ocr google".into(),
                    outcome: OutcomeKind::Success,
                }
            );
        }

        let third = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::command(3, 2, "ocr google")))
            .await;
        assert_eq!(
            third,
            DispatchOutcome::Completed {
                command: "ocr google".into(),
                outcome: OutcomeKind::UserError,
            }
        );

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 2);
        assert_eq!(fx.store.usage("ocr google").await.unwrap(), Some(2));

        // The denied call produced the only visible response.
        let initial = fx.responder.initial.lock();
        assert_eq!(initial.len(), 1);
        assert!(initial[0].text.contains("rate limited"));
        assert!(initial[0].ephemeral);
    }

    #[tokio::test]
    async fn components_share_the_parent_bucket_by_default() {
        let fx = fixture();
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher.registry().register_boxed(
            CommandMeta::new("ocr", "").rate_limit(1, Duration::from_secs(60)),
            handler.clone(),
        );

        fx.dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "ocr")))
            .await;
        let second = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::component(2, 2, "ocr", "retry")))
            .await;

        assert_eq!(
            second,
            DispatchOutcome::Completed {
                command: "ocr".into(),
                outcome: OutcomeKind::UserError,
            }
        );
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn component_scope_gives_components_their_own_window() {
        let fx = fixture_with_policy(DispatchPolicy {
            rate_scope: RateScope::Component,
            default_rate_limit: RateLimit::new(1000, Duration::from_secs(60)),
            ..DispatchPolicy::default()
        });
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher.registry().register_boxed(
            CommandMeta::new("ocr", "").rate_limit(1, Duration::from_secs(60)),
            handler.clone(),
        );

        fx.dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "ocr")))
            .await;
        fx.dispatcher
            .dispatch(Arc::new(Interaction::component(2, 2, "ocr", "retry")))
            .await;

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_dispatches_count_usage_exactly() {
        let fx = fixture();
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher
            .registry()
            .register_boxed(CommandMeta::new("ping", ""), handler.clone());

        let tasks: Vec<_> = (0..16)
            .map(|id| {
                let dispatcher = fx.dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .dispatch(Arc::new(Interaction::command(id, id, "ping")))
                        .await
                })
            })
            .collect();
        join_all(tasks).await;

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 16);
        assert_eq!(fx.store.usage("ping").await.unwrap(), Some(16));
    }

    #[tokio::test]
    async fn panicking_handler_becomes_exactly_one_fault_response() {
        let fx = fixture();
        fx.dispatcher
            .registry()
            .register(CommandMeta::new("ocr", ""), PanickingHandler);

        let outcome = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "ocr")))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: "ocr".into(),
                outcome: OutcomeKind::Fault,
            }
        );
        let initial = fx.responder.initial.lock();
        assert_eq!(initial.len(), 1);
        assert!(initial[0].text.starts_with("An error occurred."));
        assert!(initial[0].text.contains("ocr backend exploded"));
        // The executed command still counts.
        assert_eq!(fx.store.usage("ocr").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn handler_timeout_becomes_a_fault() {
        let fx = fixture_with_policy(DispatchPolicy {
            handler_timeout: Duration::from_millis(50),
            default_rate_limit: RateLimit::new(1000, Duration::from_secs(60)),
            ..DispatchPolicy::default()
        });
        fx.dispatcher
            .registry()
            .register(CommandMeta::new("slow", ""), SlowHandler);

        let outcome = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "slow")))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: "slow".into(),
                outcome: OutcomeKind::Fault,
            }
        );
        let initial = fx.responder.initial.lock();
        assert_eq!(initial.len(), 1);
        assert!(initial[0].text.contains("timed out"));
    }

    #[tokio::test]
    async fn error_after_handler_reply_takes_the_followup_path() {
        let fx = fixture();
        fx.dispatcher
            .registry()
            .register(CommandMeta::new("ocr", ""), ReplyThenFailHandler);

        fx.dispatcher
            .dispatch(Arc::new(Interaction::command(1, 2, "ocr")))
            .await;

        let initial = fx.responder.initial.lock();
        let followup = fx.responder.followup.lock();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].text, "partial result");
        assert_eq!(followup.len(), 1);
        assert_eq!(followup[0].text, "second stage failed");
    }

    #[tokio::test]
    async fn autocomplete_faults_stay_silent_and_uncounted() {
        let fx = fixture();
        fx.dispatcher
            .registry()
            .register(CommandMeta::new("ocr", ""), PanickingHandler);

        let outcome = fx
            .dispatcher
            .dispatch(Arc::new(Interaction::autocomplete(1, 2, "ocr")))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: "ocr".into(),
                outcome: OutcomeKind::Fault,
            }
        );
        assert_eq!(fx.responder.total(), 0);
        assert_eq!(fx.store.usage("ocr").await.unwrap(), None);
    }

    #[tokio::test]
    async fn dispatcher_is_a_tower_service() {
        let fx = fixture();
        let handler = Arc::new(CountingHandler::default());
        fx.dispatcher
            .registry()
            .register_boxed(CommandMeta::new("ping", ""), handler.clone());

        let outcome = assert_ok!(
            fx.dispatcher
                .clone()
                .oneshot(Arc::new(Interaction::command(1, 2, "ping")))
                .await
        );
        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: "ping".into(),
                outcome: OutcomeKind::Success,
            }
        );
    }

    #[test]
    fn builder_rejects_missing_collaborators() {
        let error = Dispatcher::builder().build().unwrap_err();
        assert!(matches!(error, SetupError::MissingCollaborator("user store")));
    }
}
