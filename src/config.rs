use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://catstore.db?mode=rwc";
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
const DEFAULT_SESSION_COOKIE: &str = "catstore_session";
const DEV_DEFAULT_SESSION_SECRET: &str = "catstore-development-session-secret-change-me-before-deploying";

const ENVIRONMENTS: [&str; 4] = ["development", "test", "staging", "production"];

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[validate(range(min = 1, message = "port must be at least 1"))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(custom = "validate_environment")]
    pub environment: String,

    #[validate(custom = "validate_log_level")]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,

    /// Whether to seed business data and accounts on startup
    #[serde(default = "default_true_bool")]
    pub seed_on_startup: bool,

    /// Key used to sign session tokens
    #[validate(length(min = 32, message = "session_secret must be at least 32 characters"))]
    pub session_secret: String,

    /// Session lifetime in seconds (1 minute - 7 days)
    #[validate(range(min = 60, max = 604800))]
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[validate(length(min = 1))]
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Mark the session cookie `Secure` (HTTPS only)
    #[serde(default)]
    pub cookie_secure: bool,

    /// Comma-separated origins allowed to call the API from a browser
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEFAULT_ENV)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.session_secret.trim() == DEV_DEFAULT_SESSION_SECRET {
            let mut err = ValidationError::new("session_secret_default_dev");
            err.message = Some(
                "The bundled development session secret must not be used outside development. Set APP__SESSION_SECRET."
                    .into(),
            );
            errors.add("session_secret", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
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

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true_bool() -> bool {
    true
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_session_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
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
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn validate_environment(environment: &str) -> Result<(), ValidationError> {
    if ENVIRONMENTS.contains(&environment.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("environment");
        err.message = Some("Must be one of: development, test, staging, production".into());
        Err(err)
    }
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

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("catstore={},tower_http=debug", level);
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

/// Built-in defaults; every setting can be overridden by a later source.
fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("session_secret", DEV_DEFAULT_SESSION_SECRET)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
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

    let config = defaults()?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config = from_config(config)?;
    info!("Configuration loaded successfully");
    Ok(app_config)
}

fn from_config(config: Config) -> Result<AppConfig, AppConfigError> {
    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn with_overrides(overrides: &[(&str, &str)]) -> Result<AppConfig, AppConfigError> {
        let mut builder = defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        from_config(builder.build()?)
    }

    #[test]
    fn defaults_describe_a_local_development_store() {
        let cfg = with_overrides(&[]).unwrap();
        assert_eq!(cfg.database_url, "sqlite://catstore.db?mode=rwc");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.auto_migrate);
        assert!(cfg.seed_on_startup);
        assert_eq!(cfg.session_ttl(), Duration::from_secs(28_800));
        assert_eq!(cfg.session_cookie_name, "catstore_session");
        assert!(cfg.is_development());
    }

    #[test]
    fn development_secret_is_rejected_in_production() {
        let result = with_overrides(&[("environment", "production")]);
        assert_matches!(result, Err(AppConfigError::Validation(errors)) if errors.field_errors().contains_key("session_secret"));

        let cfg = with_overrides(&[
            ("environment", "production"),
            ("session_secret", "a-unique-production-secret-of-sufficient-length"),
        ])
        .unwrap();
        assert!(cfg.is_production());
    }

    #[test]
    fn invalid_values_are_reported_per_field() {
        let result = with_overrides(&[
            ("log_level", "loud"),
            ("environment", "moon"),
            ("session_secret", "short"),
        ]);
        let Err(AppConfigError::Validation(errors)) = result else {
            panic!("expected validation errors");
        };
        let fields = errors.field_errors();
        assert!(fields.contains_key("log_level"));
        assert!(fields.contains_key("environment"));
        assert!(fields.contains_key("session_secret"));
    }

    #[test]
    fn session_ttl_must_stay_within_bounds() {
        assert!(with_overrides(&[("session_ttl_secs", "30")]).is_err());
        assert!(with_overrides(&[("session_ttl_secs", "604801")]).is_err());
        assert!(with_overrides(&[("session_ttl_secs", "3600")]).is_ok());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let cfg = with_overrides(&[(
            "cors_allowed_origins",
            "http://localhost:5173, https://shop.example ,",
        )])
        .unwrap();
        assert_eq!(
            cfg.cors_origins(),
            vec!["http://localhost:5173", "https://shop.example"]
        );
        assert!(with_overrides(&[]).unwrap().cors_origins().is_empty());
    }

    #[test]
    fn file_sources_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catstore.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "port = 9090\nseed_on_startup = false").unwrap();

        let config = defaults()
            .unwrap()
            .add_source(File::from(path))
            .build()
            .unwrap();
        let cfg = from_config(config).unwrap();
        assert_eq!(cfg.port, 9090);
        assert!(!cfg.seed_on_startup);
    }
}
