//! Demo Bot Example
//!
//! Drives the dispatch pipeline end to end without a real platform
//! connection: an in-process responder prints outgoing responses, a
//! [`MemoryStore`] backs user standing and usage counters, and a handful of
//! synthetic interactions play the part of the gateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package anvil --example demo_bot
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use anvil::prelude::*;
use anvil::core::error::ResponseResult;
use anvil::runtime::AnvilConfig;

/// Prints outgoing responses instead of sending them to a platform.
struct ConsoleResponder;

#[async_trait]
impl Responder for ConsoleResponder {
    async fn respond_initial(
        &self,
        interaction: &Interaction,
        payload: &ResponsePayload,
    ) -> ResponseResult<()> {
        info!(
            interaction_id = interaction.id(),
            ephemeral = payload.ephemeral,
            "[initial] {}",
            payload.text
        );
        Ok(())
    }

    async fn respond_followup(
        &self,
        interaction: &Interaction,
        payload: &ResponsePayload,
    ) -> ResponseResult<()> {
        info!(
            interaction_id = interaction.id(),
            ephemeral = payload.ephemeral,
            "[followup] {}",
            payload.text
        );
        Ok(())
    }
}

/// Replies with "pong".
struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn invoke(&self, ctx: InvocationContext) -> ExecutionResult {
        if let Err(error) = ctx.reply("pong").await {
            return ExecutionResult::fault(error.to_string());
        }
        ExecutionResult::success()
    }
}

/// Lists the most used commands, highest first.
struct CmdStatsHandler {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl CommandHandler for CmdStatsHandler {
    async fn invoke(&self, ctx: InvocationContext) -> ExecutionResult {
        let snapshot = self.store.usage_snapshot();
        if snapshot.is_empty() {
            return ExecutionResult::ephemeral_error("No command usage recorded yet.");
        }

        let lines: Vec<String> = snapshot
            .iter()
            .enumerate()
            .map(|(i, (name, count))| format!("{}. `{name}`: {count}", i + 1))
            .collect();

        if let Err(error) = ctx.reply(lines.join("\n")).await {
            return ExecutionResult::fault(error.to_string());
        }
        ExecutionResult::success()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());

    // A shadow-blacklisted troublemaker for the demo.
    store.set_standing(666, UserStanding::ShadowBlacklisted);

    let runtime = AnvilRuntime::builder()
        .config(AnvilConfig::default())
        .users(store.clone())
        .usage(store.clone())
        .responder(Arc::new(ConsoleResponder))
        .build()?;

    runtime.register_command(
        CommandMeta::new("ping", "Replies with pong").rate_limit(2, Duration::from_secs(20)),
        PingHandler,
    );
    runtime.register_command(
        CommandMeta::new("cmdstats", "Shows command usage counts"),
        CmdStatsHandler {
            store: store.clone(),
        },
    );

    let sink = runtime.event_sink();

    // Play gateway: three pings (the third gets rate limited), a silently
    // dropped event, an unknown command, then the stats.
    sink(Arc::new(Interaction::command(1, 7, "ping")));
    sink(Arc::new(Interaction::command(2, 7, "ping")));
    sink(Arc::new(Interaction::command(3, 7, "ping")));
    sink(Arc::new(Interaction::command(4, 666, "ping")));
    sink(Arc::new(Interaction::command(5, 7, "frobnicate")));
    sink(Arc::new(Interaction::command(6, 7, "cmdstats")));

    // Let the spawned dispatches finish, then exit instead of parking on
    // Ctrl+C.
    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(200)))
        .await?;

    info!(usage = ?store.usage_snapshot(), "Final usage counters");
    Ok(())
}
