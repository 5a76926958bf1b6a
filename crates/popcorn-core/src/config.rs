//! Configuration objects
//!
//! Config objects are plain `serde` types loaded from a TOML file, with
//! `POPCORN_`-prefixed environment variables layered on top. The variables
//! come from the application's [`EnvVars`], not directly from the process.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::env::EnvVars;
use crate::error::{CoreError, CoreResult};

/// Prefix of environment overrides, e.g. `POPCORN_DEBUG=true`.
pub const ENV_PREFIX: &str = "POPCORN";

/// Load a config object from a TOML file and environment overrides.
pub fn load<T: DeserializeOwned>(path: &Path, env: &EnvVars) -> CoreResult<T> {
    if !path.is_file() {
        return Err(CoreError::ConfigFileMissing {
            path: path.to_path_buf(),
        });
    }

    let overrides = env
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let config_error = |source: config::ConfigError| CoreError::Config {
        path: path.to_path_buf(),
        source,
    };

    let config = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(overrides)),
        )
        .build()
        .map_err(config_error)?;

    debug!("Loaded config from {}", path.display());
    config.try_deserialize().map_err(config_error)
}

/// Core application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment name (e.g., "production", "local")
    pub environment: String,
    pub debug: bool,
    pub base_path: PathBuf,
    /// Where generated files such as `registry.json` are written
    pub cache_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            debug: false,
            base_path: PathBuf::from("."),
            cache_path: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path, env: &EnvVars) -> CoreResult<Self> {
        load(path, env)
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
