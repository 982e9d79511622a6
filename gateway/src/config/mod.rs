use common::AppRoute;
use protocol::SseLimits;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, Result};

pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG_PATH";
pub const BASE_URL_ENV: &str = "GATEWAY_BASE_URL";
pub const TIMEOUT_ENV: &str = "GATEWAY_TIMEOUT_MS";
pub const CREDENTIALS_PATH_ENV: &str = "GATEWAY_CREDENTIALS_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Prefix joined with every request path.
    pub base_url: String,
    /// Whole-request timeout for request/response calls. Streams only use
    /// the connect timeout.
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
    /// Named route the session-expiry recovery navigates to.
    pub login_route: String,
    /// Where the credential is persisted. `None` keeps it in memory.
    pub credentials_path: Option<PathBuf>,
    /// Push every classified failure to the notification sink.
    pub notify_errors: bool,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub max_event_bytes: usize,
    pub max_line_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            user_agent: format!("gateway/{}", env!("CARGO_PKG_VERSION")),
            login_route: common::LOGIN_ROUTE.to_string(),
            credentials_path: None,
            notify_errors: true,
            stream: StreamConfig::default(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        let limits = SseLimits::default();
        Self {
            max_event_bytes: limits.max_event_bytes,
            max_line_bytes: limits.max_line_bytes,
        }
    }
}

impl GatewayConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads `.env`, then the file named by `GATEWAY_CONFIG_PATH` (if set),
    /// then applies the `GATEWAY_*` environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from_file(&path)?,
            Err(_) => Self::default(),
        };

        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            self.base_url = base_url;
        }

        if let Ok(value) = std::env::var(TIMEOUT_ENV) {
            self.timeout_ms = value.parse().map_err(|_| {
                GatewayError::Config(format!("{} must be an integer, got '{}'", TIMEOUT_ENV, value))
            })?;
        }

        if let Ok(path) = std::env::var(CREDENTIALS_PATH_ENV) {
            self.credentials_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            GatewayError::Config(format!("invalid base_url '{}': {}", self.base_url, e))
        })?;

        if AppRoute::from_name(&self.login_route).is_none() {
            return Err(GatewayError::Config(format!(
                "unknown login_route '{}'",
                self.login_route
            )));
        }

        if self.stream.max_event_bytes == 0 || self.stream.max_line_bytes == 0 {
            return Err(GatewayError::Config(
                "stream limits must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn login_route(&self) -> AppRoute {
        AppRoute::from_name(&self.login_route).unwrap_or(AppRoute::Login)
    }

    pub fn sse_limits(&self) -> SseLimits {
        SseLimits {
            max_event_bytes: self.stream.max_event_bytes,
            max_line_bytes: self.stream.max_line_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let toml_content = r#"
base_url = "https://kb.example.com/api"
timeout_ms = 3000
credentials_path = "/tmp/session.json"

[stream]
max_event_bytes = 4096
        "#;

        let config = GatewayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.base_url, "https://kb.example.com/api");
        assert_eq!(config.timeout(), Duration::from_millis(3000));
        assert_eq!(config.stream.max_event_bytes, 4096);
        assert_eq!(
            config.stream.max_line_bytes,
            SseLimits::default().max_line_bytes
        );
        assert_eq!(config.login_route(), AppRoute::Login);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let result = GatewayConfig::from_toml_str(r#"base_url = "not a url""#);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_login_route() {
        let result = GatewayConfig::from_toml_str(r#"login_route = "signin""#);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(GatewayConfig::default().validate().is_ok());
    }
}
