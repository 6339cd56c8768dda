use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::geofence::Point;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub service_area: ServiceAreaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime handed to clients on login
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    /// Lifetime of password-reset and invitation tokens
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,
    /// Mark the session cookie `Secure`; enable when served over TLS
    #[serde(default)]
    pub secure_cookies: bool,
    /// Bootstrap admin account, created on first start when set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: default_session_ttl_days(),
            reset_token_ttl_minutes: default_reset_token_ttl_minutes(),
            secure_cookies: false,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn default_session_ttl_days() -> i64 {
    30
}

fn default_reset_token_ttl_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAreaConfig {
    /// Ordered ring of [lat, lng] vertices bounding the pickup zone
    #[serde(default = "default_service_polygon")]
    pub polygon: Vec<[f64; 2]>,
}

impl Default for ServiceAreaConfig {
    fn default() -> Self {
        Self {
            polygon: default_service_polygon(),
        }
    }
}

impl ServiceAreaConfig {
    pub fn vertices(&self) -> Vec<Point> {
        self.polygon
            .iter()
            .map(|[lat, lng]| Point::new(*lat, *lng))
            .collect()
    }
}

// The harbor business district ring the shuttle fleet serves by default
fn default_service_polygon() -> Vec<[f64; 2]> {
    vec![
        [14.705, -17.455],
        [14.705, -17.43],
        [14.685, -17.43],
        [14.685, -17.455],
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Base URL used when building reset and activation links
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: None,
            from_name: default_from_name(),
            app_url: default_app_url(),
        }
    }
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some()
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Navette".to_string()
}

fn default_app_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Failed-attempt budget per client on auth endpoints
    #[serde(default = "default_auth_max_attempts")]
    pub auth_max_attempts: u32,
    #[serde(default = "default_auth_window_secs")]
    pub auth_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_max_attempts: default_auth_max_attempts(),
            auth_window_secs: default_auth_window_secs(),
        }
    }
}

fn default_auth_max_attempts() -> u32 {
    20
}

fn default_auth_window_secs() -> u64 {
    60
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
