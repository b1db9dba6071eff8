use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub classifier: ClassifierConfig,
    pub retry: RetryConfig,
    pub scoring: ScoringSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let endpoint = env::var("CLASSIFIER_ENDPOINT").unwrap_or_else(|_| {
            "https://serverless.roboflow.com/infer/workflows/aquavriksh/detect-count-and-visualize-2"
                .to_string()
        });
        let api_key = env::var("CLASSIFIER_API_KEY").unwrap_or_default();
        let timeout = Duration::from_millis(number_var("CLASSIFIER_TIMEOUT_MS", 10_000)?);

        let max_attempts = u32::try_from(number_var("CLASSIFIER_MAX_ATTEMPTS", 3)?)
            .ok()
            .filter(|attempts| *attempts > 0)
            .ok_or(ConfigError::InvalidNumber {
                key: "CLASSIFIER_MAX_ATTEMPTS",
            })?;
        let initial_backoff = Duration::from_millis(number_var("CLASSIFIER_BACKOFF_MS", 500)?);
        let max_backoff = Duration::from_millis(number_var("CLASSIFIER_MAX_BACKOFF_MS", 8_000)?);

        let baseline_award = u32::try_from(number_var("SCORING_BASELINE_AWARD", 0)?).map_err(
            |_| ConfigError::InvalidNumber {
                key: "SCORING_BASELINE_AWARD",
            },
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            classifier: ClassifierConfig {
                endpoint,
                api_key,
                timeout,
            },
            retry: RetryConfig {
                max_attempts,
                initial_backoff,
                max_backoff,
            },
            scoring: ScoringSettings { baseline_award },
        })
    }
}

fn number_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection details for the remote inference workflow.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Backoff schedule applied when the classifier is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based), doubling each time.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Operator-tunable knobs of the scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoringSettings {
    pub baseline_award: u32,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer in range")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "CLASSIFIER_ENDPOINT",
            "CLASSIFIER_API_KEY",
            "CLASSIFIER_TIMEOUT_MS",
            "CLASSIFIER_MAX_ATTEMPTS",
            "CLASSIFIER_BACKOFF_MS",
            "CLASSIFIER_MAX_BACKOFF_MS",
            "SCORING_BASELINE_AWARD",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.classifier.timeout, Duration::from_secs(10));
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.scoring.baseline_award, 0);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_classifier_attempts() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CLASSIFIER_MAX_ATTEMPTS", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key }) => assert_eq!(key, "CLASSIFIER_MAX_ATTEMPTS"),
            other => panic!("expected invalid number, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn reads_classifier_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CLASSIFIER_ENDPOINT", "http://127.0.0.1:9001/infer");
        env::set_var("CLASSIFIER_TIMEOUT_MS", "250");
        env::set_var("SCORING_BASELINE_AWARD", "1");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.classifier.endpoint, "http://127.0.0.1:9001/infer");
        assert_eq!(config.classifier.timeout, Duration::from_millis(250));
        assert_eq!(config.scoring.baseline_award, 1);
        reset_env();
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let retry = RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(retry.backoff_after(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_after(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_after(3), Duration::from_millis(350));
        assert_eq!(retry.backoff_after(9), Duration::from_millis(350));
    }
}
