//! Application error types

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::path::PathBuf;

use popcorn_di::ContainerError;
use thiserror::Error;

/// Application result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Application errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No runtime was configured")]
    MissingRuntime,

    #[error("The service container has not been loaded")]
    ContainerNotLoaded,

    #[error("Env file not found: {}", .path.display())]
    EnvFileMissing { path: PathBuf },

    #[error("Error loading env file {}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    #[error("Environment variable '{name}' {reason}")]
    Env { name: String, reason: String },

    #[error("Missing config file: {}", .path.display())]
    ConfigFileMissing { path: PathBuf },

    #[error("Error loading config file {}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Bootstrapper '{bootstrapper}' failed")]
    Bootstrap {
        bootstrapper: &'static str,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Runtime '{runtime}' failed")]
    Runtime {
        runtime: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl CoreError {
    pub fn env(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn runtime(runtime: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Runtime {
            runtime,
            source: Box::new(source),
        }
    }
}

/// Render an error and its sources, one per line.
pub fn render_chain(error: &dyn StdError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(rendered, "\n  caused by: {}", cause);
        source = cause.source();
    }
    rendered
}
