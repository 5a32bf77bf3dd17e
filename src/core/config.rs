//! Harness configuration from YAML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at a config file
pub const CONFIG_PATH_ENV: &str = "HARNESS_CONFIG";
/// Environment override for `server`
pub const SERVER_ENV: &str = "HARNESS_SERVER";
/// Environment override for `token`
pub const TOKEN_ENV: &str = "HARNESS_TOKEN";
/// Environment override for `agent_name`
pub const AGENT_NAME_ENV: &str = "HARNESS_AGENT_NAME";

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Server root, e.g. `http://localhost:8111`
    pub server: String,

    /// REST prefix appended to `server`
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Bearer token for the admin account
    #[serde(default)]
    pub token: String,

    /// Admin credentials (used by login flows, not by the REST client)
    #[serde(default = "default_admin")]
    pub admin_username: String,

    #[serde(default = "default_admin")]
    pub admin_password: String,

    /// Name of the build agent tests toggle
    #[serde(default)]
    pub agent_name: Option<String>,

    /// Timeout for a single HTTP request (in seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Polling defaults
    #[serde(default)]
    pub waits: WaitSettings,
}

/// Polling defaults for the waiters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// Attempts for entity-appearance waits
    #[serde(default = "default_entity_attempts")]
    pub entity_attempts: u32,

    /// Delay between entity-appearance attempts (in seconds)
    #[serde(default = "default_entity_delay")]
    pub entity_delay_secs: f64,

    /// Overall budget for build waits (in seconds)
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: f64,

    /// Interval between build polls (in seconds)
    #[serde(default = "default_build_poll_interval")]
    pub build_poll_interval_secs: f64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            entity_attempts: default_entity_attempts(),
            entity_delay_secs: default_entity_delay(),
            build_timeout_secs: default_build_timeout(),
            build_poll_interval_secs: default_build_poll_interval(),
        }
    }
}

impl WaitSettings {
    pub fn entity_delay(&self) -> Duration {
        seconds(self.entity_delay_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        seconds(self.build_timeout_secs)
    }

    pub fn build_poll_interval(&self) -> Duration {
        seconds(self.build_poll_interval_secs)
    }
}

/// Seconds as a `Duration`; values `validate()` rejects clamp to zero or `Duration::MAX`
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn default_api_version() -> String {
    "/app/rest".to_string()
}

fn default_admin() -> String {
    "admin".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_entity_attempts() -> u32 {
    10
}

fn default_entity_delay() -> f64 {
    1.0
}

fn default_build_timeout() -> f64 {
    300.0
}

fn default_build_poll_interval() -> f64 {
    0.5
}

impl HarnessConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HarnessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file, apply environment overrides and validate
    ///
    /// Lookup order: explicit path, `$HARNESS_CONFIG`, then
    /// `<config dir>/harness/config.yaml`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: HarnessConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .context("No config directory available; pass --config")?;
        Ok(config_dir.join("harness").join("config.yaml"))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = lookup(SERVER_ENV) {
            self.server = server;
        }
        if let Some(token) = lookup(TOKEN_ENV) {
            self.token = token;
        }
        if let Some(agent) = lookup(AGENT_NAME_ENV) {
            self.agent_name = Some(agent);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            anyhow::bail!("Config 'server' must not be empty");
        }
        if !self.server.starts_with("http://") && !self.server.starts_with("https://") {
            anyhow::bail!("Config 'server' must be an http(s) URL, got '{}'", self.server);
        }
        if self.token.trim().is_empty() {
            anyhow::bail!("Config 'token' must not be empty (set it or {})", TOKEN_ENV);
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("Config 'request_timeout_secs' must be positive");
        }
        if self.waits.entity_attempts == 0 {
            anyhow::bail!("Config 'waits.entity_attempts' must be at least 1");
        }
        for (name, value) in [
            ("waits.entity_delay_secs", self.waits.entity_delay_secs),
            ("waits.build_timeout_secs", self.waits.build_timeout_secs),
            ("waits.build_poll_interval_secs", self.waits.build_poll_interval_secs),
        ] {
            Duration::try_from_secs_f64(value)
                .with_context(|| format!("Config '{}' is not a usable number of seconds: {}", name, value))?;
        }
        if self.waits.build_timeout_secs <= 0.0 {
            anyhow::bail!("Config 'waits.build_timeout_secs' must be positive");
        }
        Ok(())
    }

    /// Full REST base URL (`server` + `api_version`)
    pub fn base_url(&self) -> String {
        format!(
            "{}{}",
            self.server.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Name of the agent tests toggle
    pub fn agent_name(&self) -> Result<&str> {
        self.agent_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .context("Config 'agent_name' is not set (e.g. docker-agent-01)")
    }
}
