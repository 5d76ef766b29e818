use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_COURIER_BASE_URL: &str = "https://apiv2.shiprocket.in";
const DEFAULT_GEOCODING_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Rate limiting of public write endpoints: requests per window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests_per_window: u32,
    /// Rate limiting: window size (seconds)
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_seconds: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 16, max = 65536))]
    pub event_channel_capacity: usize,

    /// Default page size for paginated API responses
    #[serde(default = "default_api_page_size")]
    pub api_default_page_size: u64,

    /// Maximum page size allowed for paginated API responses
    #[serde(default = "default_api_max_page_size")]
    pub api_max_page_size: u64,

    // ========== Store ==========
    /// Currency code used for catalog prices and orders
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Orders with a subtotal at or above this amount ship for free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee charged below the free-shipping threshold
    #[serde(default = "default_standard_shipping_fee")]
    pub standard_shipping_fee: Decimal,

    /// Products at or below this stock level raise a low-stock notification
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,

    /// Window (minutes) during which call requests from the same phone are deduplicated
    #[serde(default = "default_call_request_dedup_window_mins")]
    #[validate(range(min = 1, max = 10080))]
    pub call_request_dedup_window_mins: i64,

    // ========== Packaging ==========
    #[serde(default)]
    #[validate]
    pub packaging: PackagingConfig,

    // ========== Courier ==========
    #[serde(default)]
    #[validate]
    pub courier: CourierConfig,

    // ========== Geocoding ==========
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    // ========== Email ==========
    #[serde(default)]
    pub email: EmailConfig,
}

/// Fallback package measurements used when product specifications do not
/// carry a parsable weight or size.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PackagingConfig {
    #[validate(range(min = 0.01))]
    pub default_item_weight_kg: f64,
    #[validate(range(min = 1.0))]
    pub default_length_cm: f64,
    #[validate(range(min = 1.0))]
    pub default_breadth_cm: f64,
    #[validate(range(min = 1.0))]
    pub default_height_cm: f64,
    /// Divisor for volumetric weight (cm³ per kg)
    #[validate(range(min = 1000.0))]
    pub volumetric_divisor: f64,
    #[validate(range(min = 0.0))]
    pub min_chargeable_weight_kg: f64,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            default_item_weight_kg: 5.0,
            default_length_cm: 40.0,
            default_breadth_cm: 30.0,
            default_height_cm: 50.0,
            volumetric_divisor: 5000.0,
            min_chargeable_weight_kg: 0.5,
        }
    }
}

/// Courier aggregator settings. The courier integration is disabled unless
/// `enabled` is set and either a token or login credentials are present.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_courier_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Warehouse pincode shipments are picked up from
    #[serde(default = "default_pickup_pincode")]
    #[validate(custom = "validate_pincode")]
    pub pickup_pincode: String,
    /// Pickup location nickname registered with the courier aggregator
    #[serde(default = "default_pickup_location")]
    pub pickup_location: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    /// Request AWB assignment right after creating the courier order
    #[serde(default = "default_true_bool")]
    pub auto_assign_awb: bool,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_courier_base_url(),
            api_token: None,
            email: None,
            password: None,
            pickup_pincode: default_pickup_pincode(),
            pickup_location: default_pickup_location(),
            timeout_secs: default_http_timeout_secs(),
            auto_assign_awb: true,
        }
    }
}

impl CourierConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled
            && (self.api_token.is_some() || (self.email.is_some() && self.password.is_some()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeocodingConfig {
    #[serde(default = "default_true_bool")]
    pub enabled: bool,
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Nominatim usage policy requires an identifying user agent
    #[serde(default = "default_geocoding_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_geocoding_base_url(),
            user_agent: default_geocoding_user_agent(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// When disabled, emails are only logged
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default = "default_email_from")]
    pub from: String,
    /// Address receiving seller alerts (new orders, bookings, urgent call requests)
    #[serde(default)]
    pub admin_email: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: default_email_from(),
            admin_email: None,
        }
    }
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            rate_limit_requests_per_window: default_rate_limit_requests(),
            rate_limit_window_seconds: default_rate_limit_window_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            currency: default_currency(),
            free_shipping_threshold: default_free_shipping_threshold(),
            standard_shipping_fee: default_standard_shipping_fee(),
            low_stock_threshold: default_low_stock_threshold(),
            call_request_dedup_window_mins: default_call_request_dedup_window_mins(),
            packaging: PackagingConfig::default(),
            courier: CourierConfig::default(),
            geocoding: GeocodingConfig::default(),
            email: EmailConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        matches!(
            self.environment.to_ascii_lowercase().as_str(),
            "development" | "dev" | "local" | "test"
        )
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_deref()
            .map(|origins| origins.split(',').any(|o| !o.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn call_request_dedup_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.call_request_dedup_window_mins)
    }

    /// Constraints spanning several fields
    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && !self.has_cors_allowed_origins() && !self.cors_allow_any_origin
        {
            let mut err = ValidationError::new("cors_allowed_origins");
            err.message = Some(
                "Set cors_allowed_origins or cors_allow_any_origin outside development".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.api_default_page_size == 0 || self.api_default_page_size > self.api_max_page_size
        {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("Default page size must be between 1 and api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.free_shipping_threshold.is_sign_negative()
            || self.standard_shipping_fee.is_sign_negative()
        {
            let mut err = ValidationError::new("shipping");
            err.message = Some("Shipping amounts cannot be negative".into());
            errors.add("standard_shipping_fee", err);
        }

        if self.email.enabled && self.email.smtp_host.is_none() {
            let mut err = ValidationError::new("email");
            err.message = Some("email.smtp_host is required when email is enabled".into());
            errors.add("email", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}
fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}
fn default_true_bool() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::new(1000, 0)
}

fn default_standard_shipping_fee() -> Decimal {
    Decimal::new(99, 0)
}

fn default_low_stock_threshold() -> i32 {
    5
}

fn default_call_request_dedup_window_mins() -> i64 {
    30
}

fn default_courier_base_url() -> String {
    DEFAULT_COURIER_BASE_URL.to_string()
}

fn default_pickup_pincode() -> String {
    "110001".to_string()
}

fn default_pickup_location() -> String {
    "Primary".to_string()
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_geocoding_base_url() -> String {
    DEFAULT_GEOCODING_BASE_URL.to_string()
}

fn default_geocoding_user_agent() -> String {
    format!("aquacare-api/{}", env!("CARGO_PKG_VERSION"))
}

fn default_smtp_port() -> u16 {
    587
}

fn default_email_from() -> String {
    "AquaCare <no-reply@aquacare.example>".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_pincode(pincode: &str) -> Result<(), ValidationError> {
    if crate::services::is_valid_pincode(pincode) {
        Ok(())
    } else {
        let mut err = ValidationError::new("pincode");
        err.message = Some("Pincode must be 6 digits and cannot start with 0".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("aquacare_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*, nested keys separated by `__`)
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
        .set_default("database_url", "sqlite://aquacare.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", run_env.as_str())?
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

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://shop.aquacare.example".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn enabling_email_requires_smtp_host() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.email.enabled = true;
        assert!(cfg.validate_additional_constraints().is_err());
        cfg.email.smtp_host = Some("smtp.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn field_validation_rejects_bad_log_level_and_pincode() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        cfg.courier.pickup_pincode = "01234".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.errors().contains_key("log_level"));
        assert!(errors.errors().contains_key("courier"));
    }

    #[test]
    fn courier_needs_credentials_to_be_configured() {
        let mut courier = CourierConfig {
            enabled: true,
            ..CourierConfig::default()
        };
        assert!(!courier.is_configured());
        courier.api_token = Some("token".into());
        assert!(courier.is_configured());
    }

    #[test]
    fn dedup_window_is_expressed_in_minutes() {
        let cfg = base_config();
        assert_eq!(cfg.call_request_dedup_window(), chrono::Duration::minutes(30));
    }
}
