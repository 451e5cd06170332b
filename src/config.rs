//! Build configuration model, defaults, and loading.

use std::path::{Path, PathBuf};

use log::info;

use crate::build_error::BuildError;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "archipelago-directory.toml";

/// Root configuration persisted to `archipelago-directory.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Input, cache, and output file locations.
    pub paths: PathsConfig,
    #[serde(default)]
    /// RAWG lookup and progress reporting behavior.
    pub enrichment: EnrichmentConfig,
}

/// File locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_source_csv")]
    pub source_csv: PathBuf,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    #[serde(default = "default_dataset_output")]
    pub dataset_output: PathBuf,
    /// Copy of the source list taken before `curate` rewrites it.
    #[serde(default = "default_backup_csv")]
    pub backup_csv: PathBuf,
}

/// RAWG client and orchestration preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Usually supplied through `RAWG_API_KEY` instead of the file.
    #[serde(default)]
    pub api_key: String,
    /// Minimum spacing between consecutive RAWG requests.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_cache_progress_interval")]
    pub cache_progress_interval: usize,
    #[serde(default = "default_api_progress_interval")]
    pub api_progress_interval: usize,
    /// Drop cache entries whose lookup failed so they are fetched again.
    #[serde(default)]
    pub retry_failed: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_csv: default_source_csv(),
            cache_file: default_cache_file(),
            dataset_output: default_dataset_output(),
            backup_csv: default_backup_csv(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            request_interval_ms: default_request_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            cache_progress_interval: default_cache_progress_interval(),
            api_progress_interval: default_api_progress_interval(),
            retry_failed: false,
        }
    }
}

fn default_source_csv() -> PathBuf {
    PathBuf::from("data/Archipelago_Master_Game_List.csv")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("data/enrichment-cache.json")
}

fn default_dataset_output() -> PathBuf {
    PathBuf::from("src/lib/search/data/games-data.json")
}

fn default_backup_csv() -> PathBuf {
    PathBuf::from("data/Archipelago_Master_Game_List.csv.backup")
}

fn default_api_base_url() -> String {
    "https://api.rawg.io/api".to_string()
}

fn default_request_interval_ms() -> u64 {
    1_100
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_read_timeout_secs() -> u64 {
    15
}

fn default_cache_progress_interval() -> usize {
    50
}

fn default_api_progress_interval() -> usize {
    10
}

/// Clamps values that would break progress reporting or the HTTP agent.
pub fn sanitize_config(config: Config) -> Config {
    Config {
        paths: config.paths,
        enrichment: EnrichmentConfig {
            api_base_url: config
                .enrichment
                .api_base_url
                .trim()
                .trim_end_matches('/')
                .to_string(),
            api_key: config.enrichment.api_key.trim().to_string(),
            connect_timeout_secs: config.enrichment.connect_timeout_secs.max(1),
            read_timeout_secs: config.enrichment.read_timeout_secs.max(1),
            cache_progress_interval: config.enrichment.cache_progress_interval.max(1),
            api_progress_interval: config.enrichment.api_progress_interval.max(1),
            ..config.enrichment
        },
    }
}

/// Loads config from `path`, falling back to defaults when the file is absent.
///
/// An explicitly requested file that does not exist is an error; the default
/// lookup location is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, BuildError> {
    let (config_path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !config_path.exists() {
        if required {
            return Err(BuildError::Config {
                path: config_path,
                reason: "file does not exist".to_string(),
            });
        }
        info!(
            "Config: no {} found, using defaults",
            config_path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|error| BuildError::Config {
        path: config_path.clone(),
        reason: error.to_string(),
    })?;
    let config = toml::from_str::<Config>(&content).map_err(|error| BuildError::Config {
        path: config_path.clone(),
        reason: error.to_string(),
    })?;
    info!("Config: loaded {}", config_path.display());
    Ok(sanitize_config(config))
}
