use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use client_logging::level_from_name;
use listing_core::StateSettings;
use listing_engine::{ClientSettings, DEFAULT_API_URL};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::logging::LogDestination;

pub const CONFIG_FILENAME: &str = "listing_client.ron";
/// Overrides `api_url` when set and non-empty.
pub const API_URL_ENV: &str = "LISTING_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Listings per page.
    pub per_page: u32,
    pub tasks_per_page: u32,
    pub filter_debounce_ms: u64,
    pub log_level: String,
    pub log_destination: LogDestination,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            per_page: 5,
            tasks_per_page: 20,
            filter_debounce_ms: 500,
            log_level: "info".to_string(),
            log_destination: LogDestination::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ClientConfig {
    /// Reads the file, applies the environment override and validates.
    pub fn resolve(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_api_url_override(std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn apply_api_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|url| url.trim().to_string()) {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url is empty".into()));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("per_page must be at least 1".into()));
        }
        if !(1..=100).contains(&self.tasks_per_page) {
            return Err(ConfigError::Invalid(
                "tasks_per_page must be between 1 and 100".into(),
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if level_from_name(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level {:?}",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn level(&self) -> LevelFilter {
        level_from_name(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_url: self.api_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn state_settings(&self) -> StateSettings {
        StateSettings {
            tasks_per_page: self.tasks_per_page,
            listings_per_page: self.per_page,
            filter_debounce: Duration::from_millis(self.filter_debounce_ms),
        }
    }
}
