//! Connection pool configuration for the bundled sqlx adapters.
//!
//! Timeouts live here, in the transport, and never in the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool sizing and per-session settings.
///
/// # Security
/// This struct intentionally does NOT store the connection URL. URLs are
/// passed to `connect` directly and redacted before reaching any error.
///
/// # Example
/// ```rust
/// use dbscout_core::config::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_max_connections(4)
///     .with_statement_timeout(Duration::from_secs(120));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Server-side limit for one statement
    pub statement_timeout: Duration,
    /// Whether sessions are forced read-only
    pub read_only: bool,
    /// Name reported to the server for each session
    pub application_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(30),
            read_only: true,
            application_name: "dbscout".to_string(),
        }
    }
}

impl std::fmt::Display for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PoolConfig(max_connections={}, statement_timeout={}s, read_only={})",
            self.max_connections,
            self.statement_timeout.as_secs(),
            self.read_only
        )
    }
}

impl PoolConfig {
    /// Creates a pool config with safe defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Builder method to set the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Builder method to set the statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Builder method to enable/disable read-only sessions.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Builder method to set the reported application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Validates pool configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == 0 {
            return Err(crate::error::ScoutError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(crate::error::ScoutError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.acquire_timeout.is_zero() {
            return Err(crate::error::ScoutError::configuration(
                "acquire_timeout must be greater than 0",
            ));
        }

        if self.statement_timeout.is_zero() {
            return Err(crate::error::ScoutError::configuration(
                "statement_timeout must be greater than 0",
            ));
        }

        if self
            .application_name
            .chars()
            .any(|c| c == '\'' || c == '\\' || c.is_control())
        {
            return Err(crate::error::ScoutError::configuration(
                "application_name contains characters that are not allowed",
            ));
        }

        Ok(())
    }
}
