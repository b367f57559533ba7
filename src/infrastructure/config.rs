//! Configuration infrastructure
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (TOML or JSON, picked by extension), then `CRAWL_TRACKER__*` environment
//! variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::domain::JobOptions;

/// Prefix for environment overrides, e.g. `CRAWL_TRACKER__SERVICE__BASE_URL`
pub const ENV_PREFIX: &str = "CRAWL_TRACKER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub service: ServiceConfig,
    pub polling: PollingConfig,
    pub defaults: JobDefaults,
    pub logging: LoggingConfig,
}

/// Where the job service lives and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub submit_path: String,
    /// Must contain `{task_id}`
    pub status_path: String,
    pub health_path: String,
    pub timeout_seconds: u64,
    /// 0 disables client-side rate limiting
    pub max_requests_per_second: u32,
    pub user_agent: String,
}

/// Polling cadence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

/// Values applied when the caller leaves a job option out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDefaults {
    pub max_pages: u32,
    pub max_workers: u32,
    pub include_subdomains: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; defaults to `<data dir>/crawl-task-tracker/logs`
    pub directory: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            submit_path: defaults::SUBMIT_PATH.to_string(),
            status_path: defaults::STATUS_PATH.to_string(),
            health_path: defaults::HEALTH_PATH.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl Default for JobDefaults {
    fn default() -> Self {
        use crate::domain::job_request::defaults as job;
        Self {
            max_pages: job::MAX_PAGES,
            max_workers: job::MAX_WORKERS,
            include_subdomains: job::INCLUDE_SUBDOMAINS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            directory: None,
        }
    }
}

impl ServiceConfig {
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::Validation {
            message: format!("service.base_url '{}' is not a valid URL: {e}", self.base_url),
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl JobDefaults {
    /// Fills the gaps in `options` with the configured defaults
    #[must_use]
    pub fn fill(&self, options: JobOptions) -> JobOptions {
        JobOptions {
            max_pages: options.max_pages.or(Some(self.max_pages)),
            max_workers: options.max_workers.or(Some(self.max_workers)),
            include_subdomains: options.include_subdomains.or(Some(self.include_subdomains)),
        }
    }
}

impl TrackerConfig {
    /// Default config file location, `<config dir>/crawl-task-tracker/config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("crawl-task-tracker").join("config.toml"))
    }

    /// Loads the configuration from `path` (required when given) or from the
    /// default location (optional), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!(
            "Loaded tracker configuration (service: {}, poll interval: {}ms)",
            config.service.base_url, config.polling.interval_ms
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.parsed_base_url()?;

        if !self.service.status_path.contains("{task_id}") {
            return Err(ConfigError::Validation {
                message: "service.status_path must contain '{task_id}'".to_string(),
            });
        }
        if self.service.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "service.timeout_seconds must be greater than 0".to_string(),
            });
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Validation {
                message: "polling.interval_ms must be greater than 0".to_string(),
            });
        }
        if self.defaults.max_pages == 0 || self.defaults.max_workers == 0 {
            return Err(ConfigError::Validation {
                message: "defaults.max_pages and defaults.max_workers must be greater than 0"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Built-in defaults, matching the reference job service
pub mod defaults {
    pub const BASE_URL: &str = "http://localhost:8000";
    pub const SUBMIT_PATH: &str = "/api/scrape/website";
    pub const STATUS_PATH: &str = "/api/task/{task_id}";
    pub const HEALTH_PATH: &str = "/api/health";

    /// Fixed polling period of the status cadence
    pub const POLL_INTERVAL_MS: u64 = 2000;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 10;
    pub const USER_AGENT: &str = concat!("crawl-task-tracker/", env!("CARGO_PKG_VERSION"));
    pub const LOG_LEVEL: &str = "info";
}
