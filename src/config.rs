//! Configuration types for chart-mirror

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Remote chart repository connection settings
///
/// Credentials are looked up by the embedding application (for example from a
/// Helm `repositories.yaml`) and handed in here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository base URL, e.g. `https://charts.example.com/charts`
    pub url: String,

    /// Basic-auth username (ignored unless `password` is also non-blank)
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password (ignored unless `username` is also non-blank)
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Skip TLS certificate verification, for self-signed internal registries (default: false)
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl RepositoryConfig {
    /// Repository settings with defaults for everything but the URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            timeout: default_timeout(),
            insecure_skip_verify: false,
        }
    }

    /// Base URL with any trailing `/` removed
    pub fn trimmed_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Parse the base URL
    pub fn base_url(&self) -> Result<Url> {
        let trimmed = self.trimmed_url();
        if trimmed.is_empty() {
            return Err(Error::config("repository.url", "repository URL must not be empty"));
        }
        Url::parse(trimmed).map_err(|e| {
            Error::config(
                "repository.url",
                format!("invalid repository URL '{}': {}", trimmed, e),
            )
        })
    }

    /// Basic-auth pair, present only when both halves are non-blank
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().map(str::trim).unwrap_or("");
        let password = self.password.as_deref().unwrap_or("");
        if username.is_empty() || password.trim().is_empty() {
            None
        } else {
            Some((username, password))
        }
    }
}

/// Literal content substitution applied to chart archives
///
/// Disabled when `old` is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Literal to search for (e.g. "registry.old.example")
    #[serde(default)]
    pub old: String,

    /// Replacement literal
    #[serde(default)]
    pub new: String,
}

impl RewriteConfig {
    /// Substitution of `old` by `new`
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Whether archives should be rewritten at all
    pub fn is_enabled(&self) -> bool {
        !self.old.is_empty()
    }
}

/// Retry behavior configuration
///
/// Retries are bounded by wall-clock time, not by attempt count: a failing
/// artifact is retried with growing delays until `max_elapsed_time` would be
/// exceeded by the next wait.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay before first retry (default: 500 milliseconds)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 1.5)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Total time budget across all attempts (default: 30 seconds)
    #[serde(default = "default_max_elapsed_time", with = "duration_millis_serde")]
    pub max_elapsed_time: Duration,

    /// Randomize each delay by ±50% (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_elapsed_time: default_max_elapsed_time(),
            jitter: true,
        }
    }
}

/// Main configuration for a mirror run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote repository to mirror
    pub repository: RepositoryConfig,

    /// Local folder the repository is mirrored into (default: "./charts")
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// Optional content substitution applied after download
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// Retry policy for artifact downloads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Configuration for mirroring `url` into `local_dir`, everything else defaulted
    pub fn new(url: impl Into<String>, local_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository: RepositoryConfig::new(url),
            local_dir: local_dir.into(),
            rewrite: RewriteConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> Result<()> {
        self.repository.base_url()?;

        if self.local_dir.as_os_str().is_empty() {
            return Err(Error::config("local_dir", "local folder must not be empty"));
        }

        if self.repository.timeout.is_zero() {
            return Err(Error::config("repository.timeout", "timeout must be positive"));
        }

        let multiplier = self.retry.backoff_multiplier;
        if multiplier < 1.0 || !multiplier.is_finite() {
            return Err(Error::config(
                "retry.backoff_multiplier",
                format!(
                    "backoff multiplier must be a finite number of at least 1.0, got {}",
                    self.retry.backoff_multiplier
                ),
            ));
        }

        Ok(())
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_elapsed_time() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("./charts")
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
