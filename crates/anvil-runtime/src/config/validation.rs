//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AnvilConfig, LogOutput};

/// Checks invariants the schema types can't express.
///
/// Called by the runtime builder after loading; standalone embedders can call
/// it directly.
pub fn validate_config(config: &AnvilConfig) -> ConfigResult<()> {
    if config.dispatch.rate_limit_uses == 0 {
        return Err(ConfigError::Invalid(
            "dispatch.rate_limit_uses must be at least 1".into(),
        ));
    }

    if config.dispatch.rate_limit_period_secs == 0 {
        return Err(ConfigError::Invalid(
            "dispatch.rate_limit_period_secs must be at least 1".into(),
        ));
    }

    if config.dispatch.handler_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "dispatch.handler_timeout_secs must be at least 1".into(),
        ));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::Invalid(
            "logging.file_path is required when logging.output is \"file\"".into(),
        ));
    }

    Ok(())
}
