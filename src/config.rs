use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_DIR: &str = "config";

/// Payment gateway (Flow-compatible) configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Merchant API key sent as `apiKey` on every request
    pub api_key: String,

    /// Shared secret used to HMAC-sign requests; never logged
    pub secret_key: String,

    /// Provider base URL, e.g. `https://sandbox.flow.cl/api`
    pub base_url: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,

    /// ISO currency code the provider charges in
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: "test-key".to_string(),
            secret_key: "test-secret".to_string(),
            base_url: "https://sandbox.flow.cl/api".to_string(),
            timeout_secs: default_gateway_timeout_secs(),
            currency: default_currency(),
        }
    }
}

/// Checkout pricing knobs.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PricingConfig {
    /// Flat home-delivery fee; pickup is always free
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: u32,

    /// Percentage discount applied to staff buyers, floor-truncated
    #[validate(range(max = 100))]
    #[serde(default = "default_staff_discount_percent")]
    pub staff_discount_percent: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            shipping_fee: default_shipping_fee(),
            staff_discount_percent: default_staff_discount_percent(),
        }
    }
}

/// Outbound mail configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct MailerConfig {
    #[serde(default = "default_mail_from")]
    pub from_address: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            from_address: default_mail_from(),
        }
    }
}

/// Application configuration, layered from config files and `APP__` env vars.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (development, test, production)
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins; permissive in development
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Externally reachable base URL, used to build the payment provider's
    /// return and confirmation callbacks
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Per-request timeout applied by the HTTP layer, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    /// Payment gateway settings
    #[serde(default)]
    #[validate]
    pub gateway: GatewayConfig,

    /// Checkout pricing settings
    #[serde(default)]
    #[validate]
    pub pricing: PricingConfig,

    /// Outbound mail settings
    #[serde(default)]
    pub mailer: MailerConfig,
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling; every other field takes
    /// its default.
    pub fn new(
        database_url: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            public_base_url: default_public_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            gateway: GatewayConfig::default(),
            pricing: PricingConfig::default(),
            mailer: MailerConfig::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_currency() -> String {
    "CLP".to_string()
}

fn default_shipping_fee() -> u32 {
    3990
}

fn default_staff_discount_percent() -> u32 {
    15
}

fn default_mail_from() -> String {
    "ventas@snakeshop.cl".to_string()
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("snakeshop_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration.
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{run_env}.toml`
/// 4. Environment variables (`APP__` prefix, `__` separator)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://snakeshop.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_storefront_policy() {
        let cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 8080, "test");
        assert_eq!(cfg.pricing.shipping_fee, 3990);
        assert_eq!(cfg.pricing.staff_discount_percent, 15);
        assert_eq!(cfg.gateway.currency, "CLP");
        assert_eq!(cfg.gateway.timeout_secs, 10);
        assert!(cfg.is_development());
    }

    #[test]
    fn discount_percent_is_bounded() {
        let mut cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 8080, "test");
        cfg.pricing.staff_discount_percent = 250;
        assert!(cfg.validate().is_err());
    }
}
