//! # Configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not checked in)
//! 4. `UNICONNECT__<SECTION>__<KEY>` environment variables, after `.env`
//!    has been loaded by `dotenvy`
//!
//! e.g. `UNICONNECT__SERVER__PORT=9000`,
//! `UNICONNECT__MODERATION__CUSTOM_KEYWORDS=rolex,replica`.

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "UNICONNECT";

/// Upper bound for `discovery.default_radius_km`, matching the largest
/// radius a search request may ask for.
pub const MAX_DEFAULT_RADIUS_KM: f64 = 500.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub discovery: DiscoveryConfig,
    pub moderation: ModerationConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscoveryConfig {
    pub default_radius_km: f64,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModerationConfig {
    /// Extra keywords flagged under the `custom` category
    pub custom_keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    pub filter: String,
}

impl AppConfig {
    /// Loads `.env`, then every configuration layer.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("ignoring unreadable .env file: {e}");
            }
        }
        Self::load_with(&["config/default", "config/local"], environment())
    }

    /// Loads from the given optional files (extension inferred) and
    /// environment source, on top of the defaults.
    pub fn load_with(files: &[&str], env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("discovery.default_radius_km", 20.0)?
            .set_default("discovery.default_page_size", 20)?
            .set_default("discovery.max_page_size", 100)?
            .set_default("moderation.custom_keywords", Vec::<String>::new())?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?;

        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let config: AppConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.discovery;
        let radius = d.default_radius_km;
        if radius.is_nan() || radius <= 0.0 || radius > MAX_DEFAULT_RADIUS_KM {
            return Err(ConfigError::Invalid(format!(
                "discovery.default_radius_km must be greater than 0 and at most {MAX_DEFAULT_RADIUS_KM}"
            )));
        }
        if d.max_page_size == 0 || d.default_page_size == 0 || d.default_page_size > d.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "discovery.default_page_size ({}) must be between 1 and discovery.max_page_size ({})",
                d.default_page_size, d.max_page_size
            )));
        }
        Ok(())
    }
}

/// The `UNICONNECT__*` environment source.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("moderation.custom_keywords")
}
