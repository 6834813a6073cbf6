//! Configuration module for the Anvil runtime.
//!
//! Provides figment-based layered configuration loading, the serde schema,
//! and validation for settings the schema types can't enforce.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    AnvilConfig, DispatchConfig, GatewayConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
};
pub use validation::validate_config;
