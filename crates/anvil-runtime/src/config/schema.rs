//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use anvil_core::handler::RateLimit;
use anvil_dispatch::{DispatchPolicy, RateScope};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnvilConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch pipeline settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Platform connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

// =============================================================================
// Dispatch settings
// =============================================================================

/// Settings for the dispatch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Default allowed uses per rate window, for commands without their own
    /// limit.
    #[serde(default = "default_rate_limit_uses")]
    pub rate_limit_uses: u32,

    /// Default rate window length in seconds.
    #[serde(default = "default_rate_limit_period_secs")]
    pub rate_limit_period_secs: u64,

    /// Whether component presses share their parent command's rate bucket
    /// (`command`) or get their own (`component`).
    #[serde(default)]
    pub rate_scope: RateScope,

    /// Upper bound on one handler execution, in seconds.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_limit_uses: default_rate_limit_uses(),
            rate_limit_period_secs: default_rate_limit_period_secs(),
            rate_scope: RateScope::default(),
            handler_timeout_secs: default_handler_timeout_secs(),
        }
    }
}

impl DispatchConfig {
    /// Converts to the pipeline policy.
    pub fn to_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            default_rate_limit: RateLimit::new(
                self.rate_limit_uses,
                Duration::from_secs(self.rate_limit_period_secs),
            ),
            rate_scope: self.rate_scope,
            handler_timeout: Duration::from_secs(self.handler_timeout_secs),
        }
    }
}

fn default_rate_limit_uses() -> u32 {
    5
}

fn default_rate_limit_period_secs() -> u64 {
    10
}

fn default_handler_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Gateway settings
// =============================================================================

/// Settings consumed by the platform connection collaborator.
///
/// The runtime only carries these; it is the connection's business to act on
/// them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Client identity advertised during the gateway handshake, e.g.
    /// `"android"` to make the platform show a mobile indicator.
    #[serde(default)]
    pub advertise_as: Option<String>,

    /// Connection-specific settings passed through verbatim.
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Logging settings
// =============================================================================

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug-level diagnostics.
    Debug,
    /// Normal operation (default).
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }

    /// Returns the lowercase directive form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line compact output (default).
    #[default]
    Compact,
    /// The default `tracing` format.
    Full,
    /// Multi-line human-readable output.
    Pretty,
    /// Machine-readable JSON (requires the `json-log` feature).
    Json,
}

/// Log output destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output (default).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A log file; requires [`LoggingConfig::file_path`].
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Log file path, used when `output` is `file`.
    pub file_path: Option<PathBuf>,

    /// Include thread IDs in log lines.
    pub thread_ids: bool,

    /// Include source file and line number in log lines.
    pub file_location: bool,

    /// Per-module level overrides, e.g. `anvil_dispatch = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}
