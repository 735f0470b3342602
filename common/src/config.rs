use serde::Deserialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yml::Error,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalyticsConfig {
    pub base_url: String,
    pub site_url: String,
    pub api_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_row_limit")]
    pub row_limit: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_lookback_days")]
    pub benchmark_lookback_days: u32,
    #[serde(default = "default_min_impressions")]
    pub benchmark_min_impressions: u64,
    #[serde(default = "default_benchmark_ttl_hours")]
    pub benchmark_ttl_hours: u64,
    #[serde(default = "default_seed_ttl_hours")]
    pub seed_embedding_ttl_hours: u64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub keywords_path: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            benchmark_lookback_days: default_lookback_days(),
            benchmark_min_impressions: default_min_impressions(),
            benchmark_ttl_hours: default_benchmark_ttl_hours(),
            seed_embedding_ttl_hours: default_seed_ttl_hours(),
            similarity_threshold: default_similarity_threshold(),
            keywords_path: None,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_string(),
            source,
        })?;
        let config = serde_yml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_string(),
            source,
        })?;

        Ok(config)
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_page_delay_ms() -> u64 {
    200
}

fn default_row_limit() -> u32 {
    5000
}

fn default_lookback_days() -> u32 {
    90
}

fn default_min_impressions() -> u64 {
    10
}

fn default_benchmark_ttl_hours() -> u64 {
    6
}

fn default_seed_ttl_hours() -> u64 {
    24
}

fn default_similarity_threshold() -> f64 {
    0.78
}

fn default_log_level() -> String {
    "info".to_string()
}
