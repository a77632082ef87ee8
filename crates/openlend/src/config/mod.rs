use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub lending: LendingConfig,
}

impl AppConfig {
    /// Read `.env` (when present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_label(&env_or("APP_ENV", "development"));
        let server = ServerConfig {
            host: env_or("APP_HOST", "127.0.0.1"),
            port: parse_env("APP_PORT", 3000u16, ConfigError::InvalidPort)?,
        };
        let telemetry = TelemetryConfig {
            log_level: env_or("APP_LOG_LEVEL", "info"),
        };
        let lending = LendingConfig {
            evaluation_delay: Duration::from_millis(parse_env(
                "LENDING_EVALUATION_DELAY_MS",
                DEFAULT_EVALUATION_DELAY_MS,
                ConfigError::InvalidEvaluationDelay,
            )?),
            action_due_days: parse_env(
                "LENDING_ACTION_DUE_DAYS",
                DEFAULT_ACTION_DUE_DAYS,
                ConfigError::InvalidActionDueDays,
            )?,
        };

        Ok(Self {
            environment,
            server,
            telemetry,
            lending,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric variable, falling back to `default` when it is unset or blank.
fn parse_env<T: FromStr>(key: &str, default: T, invalid: ConfigError) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|_| invalid),
        _ => Ok(default),
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

const DEFAULT_EVALUATION_DELAY_MS: u64 = 3000;
const DEFAULT_ACTION_DUE_DAYS: u32 = 5;

/// Lifecycle timing knobs.
///
/// `evaluation_delay` stands in for the underwriting round-trip between submission and the
/// status decision. `action_due_days` sets the due date of generated document requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingConfig {
    pub evaluation_delay: Duration,
    pub action_due_days: u32,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            evaluation_delay: Duration::from_millis(DEFAULT_EVALUATION_DELAY_MS),
            action_due_days: DEFAULT_ACTION_DUE_DAYS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("LENDING_EVALUATION_DELAY_MS must be a non-negative number of milliseconds")]
    InvalidEvaluationDelay,
    #[error("LENDING_ACTION_DUE_DAYS must be a non-negative whole number")]
    InvalidActionDueDays,
}
