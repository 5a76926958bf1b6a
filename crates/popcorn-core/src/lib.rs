//! Application shell for Popcorn
//!
//! Builds the service container from providers, loads environment variables
//! and config objects, and drives the application's [`Runtime`].

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod provider;
pub mod runtime;

pub use crate::app::{ContainerLoader, Popcorn, PopcornBuilder};
pub use crate::bootstrap::{
    Bootstrapper, LoadAndConfigureServiceContainer, LoadConfigObjects, LoadEnvironment,
    RegisterCurrentContext, REGISTRY_MANIFEST,
};
pub use crate::config::AppConfig;
pub use crate::env::EnvVars;
pub use crate::error::{render_chain, CoreError, CoreResult};
pub use crate::provider::{CoreServiceProvider, RuntimeServiceFactory};
pub use crate::runtime::Runtime;
