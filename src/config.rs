use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::checkpoint::default_marker_path;
use crate::error::EnrichError;
use crate::registry::{DEFAULT_BASE_URL, RetryPolicy};

pub const CONFIG_FILE_NAME: &str = "cnpj-enrich.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: Option<Utf8PathBuf>,
    #[serde(default)]
    pub output: Option<Utf8PathBuf>,
    #[serde(default)]
    pub checkpoint: Option<Utf8PathBuf>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub backoff_base_ms: Option<u64>,
    #[serde(default)]
    pub delay_secs: Option<u64>,
    #[serde(default)]
    pub checkpoint_every: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub checkpoint: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub delay: Duration,
    pub checkpoint_every: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, EnrichError> {
        Self::resolve_config(Self::load(path)?)
    }

    pub fn load(path: Option<&str>) -> Result<Config, EnrichError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| EnrichError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| EnrichError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, EnrichError> {
        let max_attempts = config.max_attempts.unwrap_or(5);
        if max_attempts == 0 {
            return Err(EnrichError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let checkpoint_every = config.checkpoint_every.unwrap_or(10);
        if checkpoint_every == 0 {
            return Err(EnrichError::InvalidConfig(
                "checkpoint_every must be at least 1".to_string(),
            ));
        }

        let input = config
            .input
            .map(Utf8PathBuf::into_std_path_buf)
            .unwrap_or_else(default_input);
        let output = config
            .output
            .map(Utf8PathBuf::into_std_path_buf)
            .unwrap_or_else(default_output);
        let checkpoint = config
            .checkpoint
            .map(Utf8PathBuf::into_std_path_buf)
            .unwrap_or_else(|| default_marker_path(&output));

        Ok(ResolvedConfig {
            input,
            output,
            checkpoint,
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
            retry: RetryPolicy {
                max_attempts,
                backoff_base: Duration::from_millis(config.backoff_base_ms.unwrap_or(1000)),
            },
            delay: Duration::from_secs(config.delay_secs.unwrap_or(37)),
            checkpoint_every,
        })
    }
}

pub fn default_input() -> PathBuf {
    PathBuf::from("data").join("cnpj.xlsx")
}

pub fn default_output() -> PathBuf {
    PathBuf::from("data").join("cnpj_out.xlsx")
}
