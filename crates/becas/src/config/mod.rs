use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::scholarships::PortalPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub policy: PortalPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig::from_env()?;
        let policy = policy_from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store,
            policy,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Which record store backs the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Http,
    Memory,
}

/// Record store location and backend selection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub base_url: String,
}

impl StoreConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:3000";

    fn from_env() -> Result<Self, ConfigError> {
        let backend = match env::var("RECORD_STORE")
            .unwrap_or_else(|_| "http".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "http" | "rest" => StoreBackend::Http,
            "memory" | "mem" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidStoreBackend {
                    value: other.to_string(),
                })
            }
        };

        let base_url =
            env::var("RECORD_STORE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        if backend == StoreBackend::Http
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidStoreUrl { value: base_url });
        }

        Ok(Self { backend, base_url })
    }
}

fn policy_from_env() -> Result<PortalPolicy, ConfigError> {
    let defaults = PortalPolicy::default();

    let max_applications = parse_var("BECAS_MAX_APPLICATIONS", defaults.max_applications)?;
    let minimum_age = parse_var("BECAS_MIN_AGE", defaults.minimum_age)?;
    let income_ceiling = parse_var("BECAS_INCOME_CEILING", defaults.income_ceiling)?;
    let notify_on_decision = parse_var("BECAS_NOTIFY_ON_DECISION", defaults.notify_on_decision)?;
    let poll_secs = parse_var("BECAS_INBOX_POLL_SECS", defaults.inbox_poll_interval.as_secs())?;
    if poll_secs == 0 {
        return Err(ConfigError::InvalidNumber {
            key: "BECAS_INBOX_POLL_SECS",
        });
    }

    Ok(PortalPolicy {
        max_applications,
        minimum_age,
        income_ceiling,
        notify_on_decision,
        inbox_poll_interval: Duration::from_secs(poll_secs),
    })
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStoreBackend { value: String },
    InvalidStoreUrl { value: String },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStoreBackend { value } => {
                write!(f, "RECORD_STORE must be 'http' or 'memory', found '{value}'")
            }
            ConfigError::InvalidStoreUrl { value } => {
                write!(f, "RECORD_STORE_URL must be an http(s) URL, found '{value}'")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} has an invalid value"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
