use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub source_path: String,
    pub store_path: String,
    pub download_dir: String,
    #[serde(default)]
    pub columns: Option<ColumnConfig>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub validate_timeout_secs: Option<u64>,
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub primary_url: Option<String>,
    #[serde(default)]
    pub alternative_url: Option<String>,
}

/// Column names of the source table. Configuration, not a hardcoded contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumns {
    pub identifier: String,
    pub primary_url: String,
    pub alternative_url: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            identifier: "BRnum".to_string(),
            primary_url: "Pdf_URL".to_string(),
            alternative_url: "Report Html Address".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub source_path: Utf8PathBuf,
    pub store_path: Utf8PathBuf,
    pub download_dir: Utf8PathBuf,
    pub columns: SourceColumns,
    pub workers: usize,
    pub validate_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
}

pub const DEFAULT_WORKERS: usize = 16;
pub const DEFAULT_VALIDATE_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("report-harvest.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HarvestError> {
        let defaults = SourceColumns::default();
        let columns = match config.columns {
            Some(columns) => SourceColumns {
                identifier: columns.identifier.unwrap_or(defaults.identifier),
                primary_url: columns.primary_url.unwrap_or(defaults.primary_url),
                alternative_url: columns
                    .alternative_url
                    .unwrap_or(defaults.alternative_url),
            },
            None => defaults,
        };

        let workers = config.workers.unwrap_or(DEFAULT_WORKERS).max(1);

        Ok(ResolvedConfig {
            source_path: Utf8PathBuf::from(config.source_path),
            store_path: Utf8PathBuf::from(config.store_path),
            download_dir: Utf8PathBuf::from(config.download_dir),
            columns,
            workers,
            validate_timeout_secs: config
                .validate_timeout_secs
                .unwrap_or(DEFAULT_VALIDATE_TIMEOUT_SECS),
            fetch_timeout_secs: config
                .fetch_timeout_secs
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        })
    }
}
