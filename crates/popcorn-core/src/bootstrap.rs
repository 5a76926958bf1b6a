//! Bootstrappers
//!
//! Bootstrappers prepare an application before its runtime boots. The
//! default ones run in this order:
//!
//! 1. [`LoadAndConfigureServiceContainer`]
//! 2. [`LoadEnvironment`]
//! 3. [`LoadConfigObjects`]
//! 4. [`RegisterCurrentContext`]
//!
//! Bootstrappers added on the builder run after them.

use std::any::type_name;
use std::fs;
use std::sync::Arc;

use popcorn_di::{ContextStack, ServiceCollector, ServiceContainer};
use tracing::{debug, info};

use crate::app::Popcorn;
use crate::env::EnvVars;
use crate::error::CoreResult;
use crate::provider::CoreServiceProvider;
use crate::runtime::Runtime;

/// File name of the registry manifest written into the cache directory.
pub const REGISTRY_MANIFEST: &str = "registry.json";

pub trait Bootstrapper: Send + Sync {
    fn bootstrap(&self, popcorn: &mut Popcorn) -> CoreResult<()>;

    /// Returns the name of this bootstrapper, for logging and errors.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

pub(crate) fn defaults() -> Vec<Box<dyn Bootstrapper>> {
    vec![
        Box::new(LoadAndConfigureServiceContainer),
        Box::new(LoadEnvironment),
        Box::new(LoadConfigObjects),
        Box::new(RegisterCurrentContext),
    ]
}

// ============================================================================
// Service container
// ============================================================================

/// Loads the service container.
///
/// A container given to the builder is used as-is. Otherwise the custom
/// loader is tried first, then the container is built from the core provider
/// and the application's providers. The context stack is always made
/// available from the container.
pub struct LoadAndConfigureServiceContainer;

impl LoadAndConfigureServiceContainer {
    fn load_using_custom_loader(&self, popcorn: &Popcorn) -> CoreResult<Option<ServiceContainer>> {
        match &popcorn.container_loader {
            Some(loader) => {
                debug!("Loading service container with the custom loader");
                loader(popcorn)
            }
            None => Ok(None),
        }
    }

    fn load_using_service_providers(&self, popcorn: &Popcorn) -> CoreResult<ServiceContainer> {
        let mut collector = ServiceCollector::new();
        collector.collect(&CoreServiceProvider::new(
            popcorn.runtime.clone(),
            popcorn.context.clone(),
        ))?;

        for provider in &popcorn.providers {
            collector.collect(provider.as_ref())?;
        }

        if popcorn.discover_providers {
            collector.collect_discovered()?;
        }

        let registry = collector.into_registry()?;

        if let Some(cache_path) = &popcorn.cache_path {
            fs::create_dir_all(cache_path)?;
            let manifest = cache_path.join(REGISTRY_MANIFEST);
            fs::write(&manifest, registry.manifest().to_json()?)?;
            debug!("Wrote registry manifest to {}", manifest.display());
        }

        Ok(ServiceContainer::new(registry))
    }
}

impl Bootstrapper for LoadAndConfigureServiceContainer {
    fn bootstrap(&self, popcorn: &mut Popcorn) -> CoreResult<()> {
        if popcorn.container.is_none() {
            let container = match self.load_using_custom_loader(popcorn)? {
                Some(container) => container,
                None => self.load_using_service_providers(popcorn)?,
            };
            popcorn.set_container(container);
        }

        let container = popcorn.container()?;
        if !container.has::<ContextStack>() {
            container.instance(popcorn.context.clone(), false)?;
        }

        info!("Service container loaded");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "load-and-configure-service-container"
    }
}

// ============================================================================
// Environment and config
// ============================================================================

/// Puts [`EnvVars`] into the container, from the builder's env file or the
/// process environment.
pub struct LoadEnvironment;

impl Bootstrapper for LoadEnvironment {
    fn bootstrap(&self, popcorn: &mut Popcorn) -> CoreResult<()> {
        let env = match popcorn.env_path() {
            Some(path) => EnvVars::from_file(path)?,
            None => EnvVars::from_process(),
        };

        debug!("Loaded {} environment variables", env.len());
        popcorn.container()?.instance(Arc::new(env), true)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "load-environment"
    }
}

/// Loads every config object registered on the builder and puts it into both
/// the container and the context stack.
pub struct LoadConfigObjects;

impl Bootstrapper for LoadConfigObjects {
    fn bootstrap(&self, popcorn: &mut Popcorn) -> CoreResult<()> {
        let container = popcorn.container()?;
        let env = container.get::<EnvVars>()?;

        for source in &popcorn.config_sources {
            debug!("Loading {} from {}", source.name, source.path.display());
            let config = (source.load)(&source.path, &env)?;
            container.put(config.clone(), true)?;
            // Left over from an earlier boot attempt that failed later on.
            popcorn.context.forget_key(config.key());
            popcorn.context.set_instance(config)?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "load-config-objects"
    }
}

// ============================================================================
// Context
// ============================================================================

/// Records the current container and runtime in the context stack,
/// replacing entries left by an earlier failed boot.
pub struct RegisterCurrentContext;

impl Bootstrapper for RegisterCurrentContext {
    fn bootstrap(&self, popcorn: &mut Popcorn) -> CoreResult<()> {
        let container = popcorn.container()?.clone();
        popcorn.context.forget::<ServiceContainer>();
        popcorn.context.forget::<dyn Runtime>();
        popcorn.context.set::<ServiceContainer>(container)?;
        popcorn.context.set::<dyn Runtime>(popcorn.runtime.clone())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "register-current-context"
    }
}
