//! Client configuration.

use crate::core::domain::error::ValidationError;
use std::time::Duration;

/// Default base path of the JSON API.
pub const DEFAULT_API_PATH: &str = "/api2/json";

/// Client-side request rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained requests per second. Must be non-zero.
    pub requests_per_second: u32,
    /// Requests allowed in a burst. Must be non-zero.
    pub burst_size: u32,
}

/// Input validation policy applied when the client is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationConfig {
    /// Reject well-known system account names such as `root` or `admin`.
    pub block_reserved_usernames: bool,
    /// Minimum zxcvbn strength score for the password. `None` disables the check.
    pub password_min_score: Option<zxcvbn::Score>,
    /// Resolve the host through DNS before the client is returned.
    pub resolve_host: bool,
}

/// Configuration for [`ProxmoxClient`](crate::ProxmoxClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base path prepended to every resource path.
    pub api_path: String,
    /// Transport connect timeout.
    pub connect_timeout: Duration,
    /// Timeout of a single HTTP request.
    pub request_timeout: Duration,
    /// Pause between two task status queries.
    pub task_poll_interval: Duration,
    /// Deadline for awaiting a task. `None` waits until the task stops.
    pub task_timeout: Option<Duration>,
    /// Optional client-side rate limit.
    pub rate_limit: Option<RateLimitConfig>,
    /// Input validation policy.
    pub validation: ValidationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_path: DEFAULT_API_PATH.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            task_poll_interval: Duration::from_secs(1),
            task_timeout: None,
            rate_limit: None,
            validation: ValidationConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PROXMOX_API_PATH`: API base path (default: "/api2/json")
    /// - `PROXMOX_CONNECT_TIMEOUT_MS`: Connect timeout in milliseconds (default: 10000)
    /// - `PROXMOX_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    /// - `PROXMOX_TASK_POLL_INTERVAL_MS`: Task poll interval in milliseconds (default: 1000)
    /// - `PROXMOX_TASK_TIMEOUT_MS`: Task deadline in milliseconds (default: unset, wait indefinitely)
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str| -> Result<Option<Duration>, ValidationError> {
            lookup(key)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| ValidationError::Field {
                            field: key.to_string(),
                            message: format!("invalid {}: {}", key, e),
                        })
                })
                .transpose()
        };

        Ok(Self {
            api_path: lookup("PROXMOX_API_PATH").unwrap_or(defaults.api_path),
            connect_timeout: millis("PROXMOX_CONNECT_TIMEOUT_MS")?
                .unwrap_or(defaults.connect_timeout),
            request_timeout: millis("PROXMOX_REQUEST_TIMEOUT_MS")?
                .unwrap_or(defaults.request_timeout),
            task_poll_interval: millis("PROXMOX_TASK_POLL_INTERVAL_MS")?
                .unwrap_or(defaults.task_poll_interval),
            task_timeout: millis("PROXMOX_TASK_TIMEOUT_MS")?,
            ..defaults
        })
    }

    /// Set the API base path.
    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pause between task status queries.
    pub fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    /// Set a deadline for awaiting tasks.
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Enable or disable client-side rate limiting.
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitConfig>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the validation policy.
    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }
}
