use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
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

    /// Coercion corrections are only logged outside production.
    pub const fn logs_corrections(self) -> bool {
        !matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub submission: SubmissionConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            submission: SubmissionConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound listing submission settings.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// Upper bound on concurrent photo encodes; `None` runs every photo at once.
    pub max_concurrent_encodes: Option<usize>,
    /// Photo files are only read from beneath this directory.
    pub photo_root: PathBuf,
    pub max_photo_bytes: u64,
}

impl SubmissionConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "http://127.0.0.1:8080/api/properties";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_PHOTO_ROOT: &'static str = "uploads";
    pub const DEFAULT_MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

    fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            env::var("LISTING_SUBMIT_URL").unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }

        let timeout_secs = match env::var("LISTING_SUBMIT_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            Err(_) => Self::DEFAULT_TIMEOUT_SECS,
        };

        let max_concurrent_encodes = match env::var("LISTING_MAX_PHOTO_ENCODES") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|cap| *cap > 0)
                    .ok_or(ConfigError::InvalidEncodeCap)?,
            ),
            _ => None,
        };

        let photo_root = match env::var("LISTING_PHOTO_ROOT") {
            Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
            _ => PathBuf::from(Self::DEFAULT_PHOTO_ROOT),
        };

        let max_photo_bytes = match env::var("LISTING_MAX_PHOTO_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidPhotoLimit)?,
            Err(_) => Self::DEFAULT_MAX_PHOTO_BYTES,
        };

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            max_concurrent_encodes,
            photo_root,
            max_photo_bytes,
        })
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_concurrent_encodes: None,
            photo_root: PathBuf::from(Self::DEFAULT_PHOTO_ROOT),
            max_photo_bytes: Self::DEFAULT_MAX_PHOTO_BYTES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidEndpoint(String),
    InvalidTimeout,
    InvalidEncodeCap,
    InvalidPhotoLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidEndpoint(value) => write!(
                f,
                "LISTING_SUBMIT_URL must be an http(s) URL, got '{}'",
                value
            ),
            ConfigError::InvalidTimeout => {
                write!(f, "LISTING_SUBMIT_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidEncodeCap => {
                write!(f, "LISTING_MAX_PHOTO_ENCODES must be a positive integer")
            }
            ConfigError::InvalidPhotoLimit => {
                write!(f, "LISTING_MAX_PHOTO_BYTES must be a positive integer")
            }
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("LISTING_SUBMIT_URL");
        env::remove_var("LISTING_SUBMIT_TIMEOUT_SECS");
        env::remove_var("LISTING_MAX_PHOTO_ENCODES");
        env::remove_var("LISTING_PHOTO_ROOT");
        env::remove_var("LISTING_MAX_PHOTO_BYTES");
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
        assert_eq!(config.submission.endpoint, SubmissionConfig::DEFAULT_ENDPOINT);
        assert_eq!(config.submission.timeout, Duration::from_secs(30));
        assert_eq!(config.submission.max_concurrent_encodes, None);
        assert_eq!(config.submission.photo_root, PathBuf::from("uploads"));
        assert_eq!(config.submission.max_photo_bytes, 10 * 1024 * 1024);
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
    fn submission_settings_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LISTING_SUBMIT_URL", "https://listings.example.com/api/properties");
        env::set_var("LISTING_SUBMIT_TIMEOUT_SECS", "12");
        env::set_var("LISTING_MAX_PHOTO_ENCODES", "4");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.submission.endpoint,
            "https://listings.example.com/api/properties"
        );
        assert_eq!(config.submission.timeout, Duration::from_secs(12));
        assert_eq!(config.submission.max_concurrent_encodes, Some(4));
        reset_env();
    }

    #[test]
    fn photo_limits_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LISTING_PHOTO_ROOT", "/srv/listing-uploads");
        env::set_var("LISTING_MAX_PHOTO_BYTES", "2048");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.submission.photo_root,
            PathBuf::from("/srv/listing-uploads")
        );
        assert_eq!(config.submission.max_photo_bytes, 2048);

        env::set_var("LISTING_MAX_PHOTO_BYTES", "lots");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPhotoLimit)
        ));
        reset_env();
    }

    #[test]
    fn rejects_non_http_endpoint_and_zero_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LISTING_SUBMIT_URL", "ftp://listings.example.com");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidEndpoint(_))
        ));

        reset_env();
        env::set_var("LISTING_SUBMIT_TIMEOUT_SECS", "0");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidTimeout)));
        reset_env();
    }

    #[test]
    fn production_suppresses_correction_logging() {
        assert!(!AppEnvironment::from_str("prod").logs_corrections());
        assert!(AppEnvironment::from_str("ci").logs_corrections());
        assert!(AppEnvironment::from_str("anything").logs_corrections());
    }
}
