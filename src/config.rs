use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_COMMERCE_API_BASE_URL: &str = "https://api.shop-pro.jp";
const DEFAULT_COMMERCE_SCOPES: &str =
    "read_products write_products read_sales write_sales read_shop_coupons";
const DEFAULT_TRANSLATOR_API_URL: &str = "https://naveropenapi.apigw.ntruss.com/nmt/v1/translation";
const DEFAULT_LABEL_CONTENTS: &str = "CD";

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

    /// Export spans over OTLP (`APP__OTEL_ENABLED`)
    #[serde(default)]
    pub otel_enabled: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

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

    // ========== Commerce platform ==========
    /// Base URL of the shop REST API (also hosts the OAuth endpoints)
    #[serde(default = "default_commerce_api_base_url")]
    pub commerce_api_base_url: String,

    #[serde(default)]
    pub commerce_client_id: Option<String>,

    #[serde(default)]
    pub commerce_client_secret: Option<String>,

    /// Where the platform sends the authorization code back to
    #[serde(default = "default_commerce_redirect_url")]
    pub commerce_redirect_url: String,

    /// Space separated OAuth scopes requested at login
    #[serde(default = "default_commerce_scopes")]
    pub commerce_scopes: String,

    /// Orders older than this many months are never listed
    #[serde(default = "default_order_lookback_months")]
    #[validate(range(min = 1, max = 120))]
    pub order_lookback_months: u32,

    /// Timeout applied to every upstream HTTP call
    #[serde(default = "default_upstream_timeout_secs")]
    #[validate(range(min = 1))]
    pub upstream_timeout_secs: u64,

    // ========== Translator ==========
    #[serde(default = "default_translator_api_url")]
    pub translator_api_url: String,

    #[serde(default)]
    pub translator_key_id: Option<String>,

    #[serde(default)]
    pub translator_key_secret: Option<String>,

    /// Subtitle entries sent per translation request
    #[serde(default = "default_translation_chunk_size")]
    #[validate(range(min = 1, max = 1000))]
    pub translation_chunk_size: usize,

    /// Cost charged per translated character
    #[serde(default = "default_translation_rate_per_char")]
    #[validate(custom = "validate_rate")]
    pub translation_rate_per_char: f64,

    // ========== Labels ==========
    /// Maximum label rows per exported file
    #[serde(default = "default_label_batch_size")]
    #[validate(range(min = 1))]
    pub label_batch_size: usize,

    /// Display-width budget of the contents column
    #[serde(default = "default_label_content_budget")]
    #[validate(range(min = 1))]
    pub label_content_budget: usize,

    #[serde(default = "default_label_contents")]
    pub label_default_contents: String,

    /// Where the OAuth callback sends the browser after login
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the basics
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            otel_enabled: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            commerce_api_base_url: default_commerce_api_base_url(),
            commerce_client_id: None,
            commerce_client_secret: None,
            commerce_redirect_url: default_commerce_redirect_url(),
            commerce_scopes: default_commerce_scopes(),
            order_lookback_months: default_order_lookback_months(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            translator_api_url: default_translator_api_url(),
            translator_key_id: None,
            translator_key_secret: None,
            translation_chunk_size: default_translation_chunk_size(),
            translation_rate_per_char: default_translation_rate_per_char(),
            label_batch_size: default_label_batch_size(),
            label_content_budget: default_label_content_budget(),
            label_default_contents: default_label_contents(),
            frontend_url: default_frontend_url(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// OAuth client credentials, when both halves are configured
    pub fn commerce_credentials(&self) -> Option<(&str, &str)> {
        match (&self.commerce_client_id, &self.commerce_client_secret) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }

    /// Translator API key pair, when both halves are configured
    pub fn translator_credentials(&self) -> Option<(&str, &str)> {
        match (&self.translator_key_id, &self.translator_key_secret) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }

    pub fn upstream_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upstream_timeout_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.label_default_contents.trim().is_empty() {
            let mut err = ValidationError::new("label_default_contents_empty");
            err.message = Some("label_default_contents must not be blank".into());
            errors.add("label_default_contents", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
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

fn default_commerce_api_base_url() -> String {
    DEFAULT_COMMERCE_API_BASE_URL.to_string()
}

fn default_commerce_redirect_url() -> String {
    format!("http://localhost:{}/auth/callback", DEFAULT_PORT)
}

fn default_commerce_scopes() -> String {
    DEFAULT_COMMERCE_SCOPES.to_string()
}

fn default_order_lookback_months() -> u32 {
    3
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_translator_api_url() -> String {
    DEFAULT_TRANSLATOR_API_URL.to_string()
}

fn default_translation_chunk_size() -> usize {
    200
}

fn default_translation_rate_per_char() -> f64 {
    0.02
}

fn default_label_batch_size() -> usize {
    40
}

fn default_label_content_budget() -> usize {
    30
}

fn default_label_contents() -> String {
    DEFAULT_LABEL_CONTENTS.to_string()
}

fn default_frontend_url() -> String {
    "/".to_string()
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

fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 {
        let mut err = ValidationError::new("translation_rate_per_char");
        err.message = Some("translation_rate_per_char must be a finite, non-negative value".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool, otel_enabled: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("order_desk={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    // OTLP export when configured or when a collector endpoint is given
    let otel_enabled = otel_enabled || env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();

    if otel_enabled {
        use opentelemetry::KeyValue;
        use opentelemetry_otlp::WithExportConfig;
        use opentelemetry_sdk::{trace as sdktrace, Resource};

        let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4317".to_string());
        let service_name =
            env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "order-desk".to_string());
        let resource = Resource::new(vec![KeyValue::new("service.name", service_name)]);

        let tracer = match opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(sdktrace::config().with_resource(resource))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
        {
            Ok(tracer) => tracer,
            Err(err) => {
                error!("Failed to install OTLP pipeline: {}", err);
                if json {
                    let _ = fmt().with_env_filter(filter_directive).json().try_init();
                } else {
                    let _ = fmt().with_env_filter(filter_directive).try_init();
                }
                return;
            }
        };

        let base = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(EnvFilter::new(filter_directive));
        if json {
            let _ = base.with(fmt::layer().json()).try_init();
        } else {
            let _ = base.with(fmt::layer()).try_init();
        }
    } else if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Docker config (config/docker.toml) if DOCKER env var is set
/// 5. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
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

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://order_desk.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("otel_enabled", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    if env::var("DOCKER").is_ok() {
        info!("Docker environment detected");
        builder =
            builder.add_source(File::with_name(&format!("{}/docker", CONFIG_DIR)).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if app_config.commerce_credentials().is_none() {
        info!("Commerce OAuth client is not configured; login will be unavailable");
    }
    if app_config.translator_credentials().is_none() {
        info!("Translator keys are not configured; subtitle translation will be unavailable");
    }

    info!("Configuration loaded successfully");
    Ok(app_config)
}
