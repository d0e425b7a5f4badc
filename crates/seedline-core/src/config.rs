//! Configuration management for Seedline.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration.
///
/// This is loaded from `~/.config/seedline/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seed producer behaviour
    pub seeding: SeedingConfig,
    /// Reference HTTP fetcher settings
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// if the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SEEDLINE_USE_CACHE`: Override fetch caching (true/false)
    /// - `SEEDLINE_POLL_TIMEOUT_MS`: Override the default result poll timeout
    /// - `SEEDLINE_SCOPE_POLICY`: Override the scope policy (`domain`/`origin`)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable booleans and numbers are ignored; an unknown scope
    /// policy is rejected.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SEEDLINE_USE_CACHE") {
            if let Ok(use_cache) = val.parse() {
                self.seeding.use_cache = use_cache;
                tracing::debug!("Override seeding.use_cache from env: {}", use_cache);
            }
        }

        if let Some(val) = lookup("SEEDLINE_POLL_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.seeding.poll_timeout_ms = ms;
                tracing::debug!("Override seeding.poll_timeout_ms from env: {}", ms);
            }
        }

        if let Some(val) = lookup("SEEDLINE_SCOPE_POLICY") {
            self.seeding.scope_policy = val.parse()?;
            tracing::debug!("Override seeding.scope_policy from env: {}", val);
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/seedline/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "seedline", "seedline").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// How a produced item is matched against the target it came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// Host names must match; scheme and port are ignored.
    #[default]
    Domain,
    /// Scheme, host and port must all match.
    Origin,
}

impl FromStr for ScopePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domain" => Ok(Self::Domain),
            "origin" => Ok(Self::Origin),
            other => Err(ConfigError::InvalidValue {
                field: "scope_policy".to_string(),
                reason: format!("expected `domain` or `origin`, got `{other}`"),
            }),
        }
    }
}

/// Seed producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// Serve repeat fetches of a target from the fetcher's cache
    pub use_cache: bool,
    /// Default bounded wait for `get_result`, in milliseconds
    pub poll_timeout_ms: u64,
    /// Origin matching policy for produced items
    pub scope_policy: ScopePolicy,
}

impl SeedingConfig {
    /// The default poll timeout as a `Duration`.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            poll_timeout_ms: 500,
            scope_policy: ScopePolicy::Domain,
        }
    }
}

/// HTTP fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Consecutive failures after which the fetcher asks the scan to stop
    pub max_consecutive_errors: u32,
    /// Maximum redirects followed per request
    pub max_redirects: usize,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Seedline/0.1.0 (+https://github.com/seedline/seedline)".to_string(),
            max_consecutive_errors: 10,
            max_redirects: 10,
            system_proxy: true,
        }
    }
}
