use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use monitor_core::{MonitorConfig, Route, RouteError, RouteTable};
use monitor_engine::ClientSettings;
use serde::Deserialize;
use thiserror::Error;

use super::cli::Cli;
use super::logging::LogDestination;

/// Shortest poll interval accepted from configuration.
const MIN_INTERVAL_MS: u64 = 1_000;
/// Shortest request timeout accepted from configuration.
const MIN_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid base url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("poll interval {0} ms is below the {min} ms minimum", min = MIN_INTERVAL_MS)]
    IntervalTooShort(u64),
    #[error("request timeout {0} ms is below the {min} ms minimum", min = MIN_TIMEOUT_MS)]
    TimeoutTooShort(u64),
    #[error(transparent)]
    Routes(#[from] RouteError),
}

/// Everything the binary can be told, from the RON file or the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub auto_reload: bool,
    pub request_timeout_ms: u64,
    /// Path of the page being mirrored; picks the section to refresh.
    pub page_path: String,
    pub csrf_token: Option<String>,
    pub cookie: Option<String>,
    pub delegated_refresh: bool,
    pub log_level: String,
    pub log_destination: LogDestination,
    /// Replaces the built-in section routes when present.
    pub routes: Option<Vec<Route>>,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            poll_interval_ms: MonitorConfig::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            auto_reload: true,
            request_timeout_ms: client.request_timeout.as_millis() as u64,
            page_path: "/dashboard/".to_string(),
            csrf_token: None,
            cookie: None,
            delegated_refresh: true,
            log_level: "info".to_string(),
            log_destination: LogDestination::Terminal,
            routes: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.base_url {
            self.base_url = url.clone();
        }
        if let Some(ms) = cli.interval_ms {
            self.poll_interval_ms = ms;
        }
        if cli.no_auto_reload {
            self.auto_reload = false;
        }
        if let Some(path) = &cli.path {
            self.page_path = path.clone();
        }
        if let Some(token) = &cli.csrf_token {
            self.csrf_token = Some(token.clone());
        }
        if let Some(cookie) = &cli.cookie {
            self.cookie = Some(cookie.clone());
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        if self.poll_interval_ms < MIN_INTERVAL_MS {
            return Err(ConfigError::IntervalTooShort(self.poll_interval_ms));
        }
        let routes = match &self.routes {
            Some(routes) => RouteTable::new(routes.clone())?,
            None => RouteTable::default(),
        };
        Ok(MonitorConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            auto_reload: self.auto_reload,
            routes,
        })
    }

    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        if self.request_timeout_ms < MIN_TIMEOUT_MS {
            return Err(ConfigError::TimeoutTooShort(self.request_timeout_ms));
        }
        let parsed = url::Url::parse(&self.base_url).map_err(|err| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            message: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.base_url.clone(),
                message: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        Ok(ClientSettings {
            base_url: self.base_url.clone(),
            cookie: self.cookie.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..ClientSettings::default()
        })
    }
}
