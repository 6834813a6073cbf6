//! Configuration loader using figment.
//!
//! Supports layered configuration from multiple sources. Priority, lowest to
//! highest:
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`anvil.{profile}.toml`)
//! 3. Main config file (`anvil.toml`)
//! 4. Environment variables (`ANVIL_*`)
//! 5. Programmatic overrides
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML configuration files (`anvil.toml`)
//! - `yaml-config`: enables YAML configuration files (`anvil.yaml`, `anvil.yml`)
//!
//! Both can be enabled simultaneously; all enabled formats are searched.
//!
//! # Environment Variable Mapping
//!
//! Variables use the `ANVIL_` prefix with `__` as the section separator:
//!
//! - `ANVIL_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `ANVIL_DISPATCH__RATE_LIMIT_USES=2` → `dispatch.rate_limit_uses = 2`
//! - `ANVIL_GATEWAY__ADVERTISE_AS=android` → `gateway.advertise_as = "android"`

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::AnvilConfig;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "ANVIL_";

/// Base name of configuration files.
const FILE_STEM: &str = "anvil";

/// Configuration loader with figment-based multi-source support.
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .with_current_dir()
///     .profile("production")
///     .load()?;
/// ```
pub struct ConfigLoader {
    files: Vec<PathBuf>,
    search_paths: Vec<PathBuf>,
    profile: Option<String>,
    use_env: bool,
    overrides: Vec<AnvilConfig>,
}

impl ConfigLoader {
    /// Creates a loader with no sources beyond the built-in defaults and
    /// environment variables.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            search_paths: Vec::new(),
            profile: None,
            use_env: true,
            overrides: Vec::new(),
        }
    }

    /// Adds an explicit configuration file. Missing explicit files are an
    /// error, unlike searched locations.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds a directory to search for `anvil.*` configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Searches the current directory.
    pub fn with_current_dir(self) -> Self {
        self.search_path(".")
    }

    /// Searches the user's configuration directory (`~/.config/anvil` on
    /// Linux).
    pub fn with_user_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(FILE_STEM)),
            None => self,
        }
    }

    /// Sets the configuration profile (e.g. `"production"`), enabling
    /// `anvil.{profile}.*` files.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Enables `ANVIL_*` environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Disables environment variable overrides.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Merges additional configuration programmatically, above all other
    /// sources.
    pub fn merge(mut self, config: AnvilConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Loads and extracts the configuration.
    pub fn load(self) -> ConfigResult<AnvilConfig> {
        let mut figment = Figment::from(Serialized::defaults(AnvilConfig::default()));

        // Searched locations: profile files first so the main file wins.
        for dir in &self.search_paths {
            if let Some(profile) = &self.profile {
                for candidate in candidates(dir, &format!("{FILE_STEM}.{profile}")) {
                    figment = merge_existing(figment, &candidate)?;
                }
            }
            for candidate in candidates(dir, FILE_STEM) {
                figment = merge_existing(figment, &candidate)?;
            }
        }

        // Explicit files must exist.
        for file in &self.files {
            if !file.exists() {
                return Err(ConfigError::FileNotFound(file.clone()));
            }
            figment = merge_file(figment, file)?;
        }

        if self.use_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        for config in self.overrides {
            figment = figment.merge(Serialized::defaults(config));
        }

        Ok(figment.extract()?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// All file candidates for `stem` in `dir`, one per enabled format.
fn candidates(dir: &Path, stem: &str) -> Vec<PathBuf> {
    #[cfg_attr(
        not(any(feature = "toml-config", feature = "yaml-config")),
        allow(unused_mut)
    )]
    let mut paths = Vec::new();

    #[cfg(feature = "toml-config")]
    paths.push(dir.join(format!("{stem}.toml")));

    #[cfg(feature = "yaml-config")]
    {
        paths.push(dir.join(format!("{stem}.yaml")));
        paths.push(dir.join(format!("{stem}.yml")));
    }

    #[cfg(not(any(feature = "toml-config", feature = "yaml-config")))]
    let _ = (dir, stem);

    paths
}

/// Merges `path` if it exists; searched candidates are optional.
fn merge_existing(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    if path.exists() {
        debug!(path = %path.display(), "Merging configuration file");
        merge_file(figment, path)
    } else {
        Ok(figment)
    }
}

/// Merges `path` by extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match extension {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Loads configuration from the default locations (current directory, then
/// the user config directory) with environment overrides.
pub fn load_config() -> ConfigResult<AnvilConfig> {
    ConfigLoader::new()
        .with_current_dir()
        .with_user_dir()
        .load()
}

/// Loads configuration from a specific file with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<AnvilConfig> {
    ConfigLoader::new().file(path).load()
}
