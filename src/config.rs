use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::relocation::{RelocationSettings, RelocationStrategy};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
const DEFAULT_STRATEGY: &str = "sequential";
pub const CONFIG_DIR: &str = "config";

/// Relocation behaviour
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RelocationConfig {
    /// Pause between a committed removal and the follow-up create, in
    /// milliseconds
    #[serde(default = "default_settle_delay_ms")]
    #[validate(range(max = 5000))]
    pub settle_delay_ms: u64,

    /// "sequential" (remove, pause, create) or "atomic" (single relocate call)
    #[serde(default = "default_strategy")]
    #[validate(custom = "validate_strategy")]
    pub strategy: String,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            strategy: default_strategy(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the placement API, e.g. `https://assets.example.com/api/v1`
    #[validate(url)]
    pub api_base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Relocation configuration
    #[serde(default)]
    #[validate]
    pub relocation: RelocationConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the
    /// endpoint and environment
    pub fn new(api_base_url: String, environment: String) -> Self {
        Self {
            api_base_url,
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            relocation: RelocationConfig::default(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Coordinator settings derived from the relocation section.
    pub fn relocation_settings(&self) -> RelocationSettings {
        let strategy = self
            .relocation
            .strategy
            .parse::<RelocationStrategy>()
            .unwrap_or_default();
        RelocationSettings {
            settle_delay: Duration::from_millis(self.relocation.settle_delay_ms),
            strategy,
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationError> {
        if self.is_production() && !self.api_base_url.starts_with("https://") {
            let mut err = ValidationError::new("api_base_url_insecure");
            err.message = Some("Production deployments must reach the placement API over https".into());
            return Err(err);
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
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

fn validate_strategy(value: &str) -> Result<(), ValidationError> {
    match value.parse::<RelocationStrategy>() {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("relocation_strategy");
            err.message = Some("Must be one of: sequential, atomic".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("asset_placement={},placement_cli={}", level, level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration from the `config` directory of the
/// working directory
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (`APP__*`, `__` separates nested keys)
pub fn load_config_from(dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("api_base_url", DEFAULT_API_BASE_URL)?
        .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        let mut errors = ValidationErrors::new();
        errors.add("api_base_url", e);
        AppConfigError::Validation(errors)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
