use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::core::keywords::KeywordTables;
use crate::core::SearchOptions;
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    pub supabase: Option<SupabaseSettings>,
    pub database: Option<DatabaseSettings>,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Which clinic store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Supabase,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON clinic list for the memory backend
    pub fixtures_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    #[serde(default)]
    pub service_key: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default)]
    pub keywords: KeywordTables,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            max_results: default_max_results(),
            default_radius_km: default_radius_km(),
            store_timeout_secs: default_store_timeout_secs(),
            max_suggestions: default_max_suggestions(),
            keywords: KeywordTables::default(),
        }
    }
}

impl SearchSettings {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            pool_size: self.pool_size,
            max_results: self.max_results,
            store_timeout: Duration::from_secs(self.store_timeout_secs),
            max_suggestions: self.max_suggestions,
        }
    }
}

fn default_pool_size() -> usize { 150 }
fn default_max_results() -> usize { 15 }
fn default_radius_km() -> f64 { 15.0 }
fn default_store_timeout_secs() -> u64 { 5 }
fn default_max_suggestions() -> usize { 3 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_base_weight")]
    pub base: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_paid_weight")]
    pub paid: f64,
    #[serde(default = "default_treatment_weight")]
    pub treatment_match: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            base: default_base_weight(),
            rating: default_rating_weight(),
            paid: default_paid_weight(),
            treatment_match: default_treatment_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            base: config.base,
            rating: config.rating,
            paid: config.paid,
            treatment_match: config.treatment_match,
        }
    }
}

fn default_base_weight() -> f64 { 0.5 }
fn default_rating_weight() -> f64 { 0.25 }
fn default_paid_weight() -> f64 { 0.15 }
fn default_treatment_weight() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with CLINIC_SEARCH)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., CLINIC_SEARCH__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("CLINIC_SEARCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply the conventional Supabase and Postgres variables on top of the
/// prefixed ones, so the service runs with the same `.env` as the web app
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("SUPABASE_URL") {
        builder = builder.set_override("supabase.url", url)?;
    }
    if let Ok(key) = env::var("SUPABASE_SERVICE_ROLE_KEY") {
        builder = builder.set_override("supabase.service_key", key)?;
    }
    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }

    builder.build()
}
