//! RON configuration file for the `taxdesk` binary.
//!
//! Every field is optional in the file; missing ones fall back to the
//! defaults below. Command line flags are applied on top afterwards.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taxdesk_core::{ConfigError, RevealOptions, WatchOptions};
use taxdesk_engine::{ApiSettings, SessionOptions};
use taxdesk_logging::desk_info;
use thiserror::Error;

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_PATH: &str = "./taxdesk.ron";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env_var: String,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    pub chars_per_tick: usize,
    pub tick_ms: u64,
    pub request_timeout_ms: u64,
    pub animate: bool,
    pub log_destination: LogDestination,
    pub output_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: ApiSettings::default().base_url,
            token_env_var: "TAXDESK_TOKEN".to_string(),
            // 60 polls 1.5 s apart: about a minute and a half of waiting.
            poll_interval_ms: 1500,
            max_attempts: 60,
            chars_per_tick: 3,
            tick_ms: 20,
            request_timeout_ms: 30_000,
            animate: true,
            log_destination: LogDestination::File,
            output_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`. A missing file at the default location yields defaults;
    /// a missing file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigLoadError::Read { path, source }),
        };
        let config = Self::from_ron(&content).map_err(|source| ConfigLoadError::Parse {
            path: path.clone(),
            source,
        })?;
        desk_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    pub fn watch_options(&self) -> Result<WatchOptions, ConfigError> {
        WatchOptions::new(
            Duration::from_millis(self.poll_interval_ms),
            self.max_attempts,
        )
    }

    pub fn reveal_options(&self) -> Result<RevealOptions, ConfigError> {
        Ok(
            RevealOptions::new(self.chars_per_tick, Duration::from_millis(self.tick_ms))?
                .with_streaming(self.animate),
        )
    }

    pub fn session_options(&self) -> Result<SessionOptions, ConfigLoadError> {
        Ok(SessionOptions {
            watch: self.watch_options()?,
            reveal: self.reveal_options()?,
        })
    }

    pub fn api_settings(&self) -> ApiSettings {
        let defaults = ApiSettings::default();
        ApiSettings {
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..defaults
        }
    }
}
