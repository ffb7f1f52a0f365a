//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub jwt: JwtConfig,
    pub realtime: RealtimeConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(ConfigError::InvalidValue("APP_ENV", s.to_string())),
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry: i64,
}

/// Tunables of the realtime core
///
/// Intervals and timeouts are stored in whole seconds and exposed as `Duration`s.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Messages retained per offline user before the oldest is evicted
    pub offline_queue_capacity: usize,
    /// Backlogs not written to for this long are dropped
    pub offline_queue_ttl_secs: u64,
    /// Outbound buffer per connection; a full buffer makes sends fail
    pub send_buffer_size: usize,
    pub heartbeat_interval_secs: u64,
    pub reaper_interval_secs: u64,
    pub stale_connection_timeout_secs: u64,
    pub session_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub auth_timeout_secs: u64,
    pub auth_max_attempts: u32,
    pub collaborator_timeout_secs: u64,
    /// Recent messages replayed to the responder
    pub history_window: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            offline_queue_capacity: 100,
            offline_queue_ttl_secs: 86_400,
            send_buffer_size: 256,
            heartbeat_interval_secs: 30,
            reaper_interval_secs: 60,
            stale_connection_timeout_secs: 120,
            session_ttl_secs: 86_400,
            session_sweep_interval_secs: 300,
            auth_timeout_secs: 10,
            auth_max_attempts: 3,
            collaborator_timeout_secs: 30,
            history_window: 10,
        }
    }
}

impl RealtimeConfig {
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    #[must_use]
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    #[must_use]
    pub fn stale_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.stale_connection_timeout_secs)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    #[must_use]
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    #[must_use]
    pub fn offline_queue_ttl(&self) -> Duration {
        Duration::from_secs(self.offline_queue_ttl_secs)
    }

    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    #[must_use]
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Reject combinations the maintenance loop cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.offline_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "OFFLINE_QUEUE_CAPACITY",
                "must be greater than zero".to_string(),
            ));
        }
        if self.send_buffer_size == 0 {
            return Err(ConfigError::InvalidValue(
                "SEND_BUFFER_SIZE",
                "must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0
            || self.reaper_interval_secs == 0
            || self.session_sweep_interval_secs == 0
        {
            return Err(ConfigError::InvalidValue(
                "*_INTERVAL_SECS",
                "intervals must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval_secs >= self.stale_connection_timeout_secs {
            return Err(ConfigError::InvalidValue(
                "HEARTBEAT_INTERVAL_SECS",
                "must be shorter than STALE_CONNECTION_TIMEOUT_SECS".to_string(),
            ));
        }
        if self.auth_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "AUTH_MAX_ATTEMPTS",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_app_name() -> String {
    "livechat".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_token_expiry() -> i64 {
    900 // 15 minutes
}

/// Read an optional variable, falling back to `default` when unset
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required variables are missing or values do not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = RealtimeConfig::default();
        let realtime = RealtimeConfig {
            offline_queue_capacity: env_or("OFFLINE_QUEUE_CAPACITY", defaults.offline_queue_capacity)?,
            offline_queue_ttl_secs: env_or("OFFLINE_QUEUE_TTL_SECS", defaults.offline_queue_ttl_secs)?,
            send_buffer_size: env_or("SEND_BUFFER_SIZE", defaults.send_buffer_size)?,
            heartbeat_interval_secs: env_or("HEARTBEAT_INTERVAL_SECS", defaults.heartbeat_interval_secs)?,
            reaper_interval_secs: env_or("REAPER_INTERVAL_SECS", defaults.reaper_interval_secs)?,
            stale_connection_timeout_secs: env_or(
                "STALE_CONNECTION_TIMEOUT_SECS",
                defaults.stale_connection_timeout_secs,
            )?,
            session_ttl_secs: env_or("SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            session_sweep_interval_secs: env_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval_secs,
            )?,
            auth_timeout_secs: env_or("AUTH_TIMEOUT_SECS", defaults.auth_timeout_secs)?,
            auth_max_attempts: env_or("AUTH_MAX_ATTEMPTS", defaults.auth_max_attempts)?,
            collaborator_timeout_secs: env_or(
                "COLLABORATOR_TIMEOUT_SECS",
                defaults.collaborator_timeout_secs,
            )?,
            history_window: env_or("HISTORY_WINDOW", defaults.history_window)?,
        };
        realtime.validate()?;

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host()),
                port: env_or("GATEWAY_PORT", default_port())?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?,
                token_expiry: env_or("JWT_TOKEN_EXPIRY", default_token_expiry())?,
            },
            realtime,
        })
    }

    /// Configuration for tests and embedding, without touching the environment
    #[must_use]
    pub fn for_testing(secret: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::Development,
            },
            gateway: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            jwt: JwtConfig {
                secret: secret.into(),
                token_expiry: default_token_expiry(),
            },
            realtime: RealtimeConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
