//! The application and its builder
//!
//! ```rust,ignore
//! let mut popcorn = Popcorn::builder()
//!     .use_cache_in("var/cache")
//!     .load_env_from(".env")
//!     .load_config_from::<AppConfig>("config/app.toml")
//!     .using_provider(AppServiceProvider)
//!     .with_runtime(Arc::new(HttpRuntime::new()))
//!     .build()?;
//!
//! popcorn.boot()?;
//! popcorn.run()?;
//! ```

use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use popcorn_di::{ContextStack, Instance, ServiceContainer, ServiceProvider};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::bootstrap::{self, Bootstrapper};
use crate::env::EnvVars;
use crate::error::{CoreError, CoreResult};
use crate::runtime::Runtime;

/// Builds the service container for an application, or returns `None` to
/// fall back to the application's providers.
pub type ContainerLoader =
    Box<dyn Fn(&Popcorn) -> CoreResult<Option<ServiceContainer>> + Send + Sync>;

type ConfigLoader = fn(&Path, &EnvVars) -> CoreResult<Instance>;

/// A config object to load during boot.
pub(crate) struct ConfigSource {
    pub(crate) name: &'static str,
    pub(crate) path: PathBuf,
    pub(crate) load: ConfigLoader,
}

fn load_config_instance<T>(path: &Path, env: &EnvVars) -> CoreResult<Instance>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    crate::config::load::<T>(path, env).map(Instance::of)
}

// ============================================================================
// Popcorn
// ============================================================================

/// A bootstrapped application.
pub struct Popcorn {
    pub(crate) container: Option<Arc<ServiceContainer>>,
    pub(crate) runtime: Arc<dyn Runtime>,
    pub(crate) context: Arc<ContextStack>,
    pub(crate) bootstrappers: Vec<Box<dyn Bootstrapper>>,
    pub(crate) cache_path: Option<PathBuf>,
    pub(crate) env_path: Option<PathBuf>,
    pub(crate) config_sources: Vec<ConfigSource>,
    pub(crate) providers: Vec<Box<dyn ServiceProvider>>,
    pub(crate) discover_providers: bool,
    pub(crate) container_loader: Option<ContainerLoader>,
    booted: bool,
}

impl Popcorn {
    pub fn builder() -> PopcornBuilder {
        PopcornBuilder::default()
    }

    pub fn container(&self) -> CoreResult<&Arc<ServiceContainer>> {
        self.container.as_ref().ok_or(CoreError::ContainerNotLoaded)
    }

    pub fn set_container(&mut self, container: ServiceContainer) -> &mut Self {
        self.container = Some(Arc::new(container));
        self
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    pub fn context(&self) -> &Arc<ContextStack> {
        &self.context
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    pub fn env_path(&self) -> Option<&Path> {
        self.env_path.as_deref()
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Run the bootstrappers in order, then boot the runtime.
    ///
    /// Booting an application a second time does nothing.
    pub fn boot(&mut self) -> CoreResult<()> {
        if self.booted {
            warn!("Application already booted");
            return Ok(());
        }

        let bootstrappers = mem::take(&mut self.bootstrappers);
        let result = bootstrappers.iter().try_for_each(|bootstrapper| {
            debug!("Running bootstrapper '{}'", bootstrapper.name());
            bootstrapper
                .bootstrap(self)
                .map_err(|error| CoreError::Bootstrap {
                    bootstrapper: bootstrapper.name(),
                    source: Box::new(error),
                })
        });
        self.bootstrappers = bootstrappers;
        result?;

        self.runtime.boot(self.container()?)?;
        self.booted = true;

        info!("Booted application with runtime '{}'", self.runtime.name());
        Ok(())
    }

    pub fn run(&self) -> CoreResult<()> {
        let container = self.container()?;
        info!("Running runtime '{}'", self.runtime.name());
        self.runtime.run(container)
    }
}

impl fmt::Debug for Popcorn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Popcorn")
            .field("runtime", &self.runtime.name())
            .field("container_loaded", &self.container.is_some())
            .field("bootstrappers", &self.bootstrappers.len())
            .field("cache_path", &self.cache_path)
            .field("booted", &self.booted)
            .finish()
    }
}

// ============================================================================
// PopcornBuilder
// ============================================================================

#[derive(Default)]
pub struct PopcornBuilder {
    cache_path: Option<PathBuf>,
    env_path: Option<PathBuf>,
    config_sources: Vec<ConfigSource>,
    providers: Vec<Box<dyn ServiceProvider>>,
    discover_providers: bool,
    container: Option<ServiceContainer>,
    container_loader: Option<ContainerLoader>,
    bootstrappers: Vec<Box<dyn Bootstrapper>>,
    runtime: Option<Arc<dyn Runtime>>,
}

impl PopcornBuilder {
    /// Directory for generated files such as the registry manifest.
    pub fn use_cache_in(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(dir.into());
        self
    }

    /// Read environment variables from a dotenv file instead of the process.
    pub fn load_env_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_path = Some(path.into());
        self
    }

    /// Load a config object of type `T` from a TOML file during boot.
    pub fn load_config_from<T>(mut self, path: impl Into<PathBuf>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.config_sources.push(ConfigSource {
            name: std::any::type_name::<T>(),
            path: path.into(),
            load: load_config_instance::<T>,
        });
        self
    }

    pub fn using_provider<P: ServiceProvider>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn using_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn ServiceProvider>>,
    {
        self.providers.extend(providers);
        self
    }

    /// Also collect providers submitted through `inventory`.
    pub fn discover_providers(mut self) -> Self {
        self.discover_providers = true;
        self
    }

    /// Use a ready-made container. Providers and loaders are ignored.
    pub fn with_container(mut self, container: ServiceContainer) -> Self {
        self.container_loader = None;
        self.container = Some(container);
        self
    }

    pub fn load_container_using<F>(mut self, loader: F) -> Self
    where
        F: Fn(&Popcorn) -> CoreResult<Option<ServiceContainer>> + Send + Sync + 'static,
    {
        self.container = None;
        self.container_loader = Some(Box::new(loader));
        self
    }

    /// Extra bootstrappers, run after the default ones.
    pub fn using_bootstrappers<I>(mut self, bootstrappers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Bootstrapper>>,
    {
        self.bootstrappers.extend(bootstrappers);
        self
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> CoreResult<Popcorn> {
        let runtime = self.runtime.ok_or(CoreError::MissingRuntime)?;

        if let Some(path) = &self.env_path {
            if !path.is_file() {
                return Err(CoreError::EnvFileMissing { path: path.clone() });
            }
        }

        let mut bootstrappers = bootstrap::defaults();
        bootstrappers.extend(self.bootstrappers);

        debug!(
            "Built application with {} providers, {} config objects and {} bootstrappers",
            self.providers.len(),
            self.config_sources.len(),
            bootstrappers.len()
        );

        Ok(Popcorn {
            container: self.container.map(Arc::new),
            runtime,
            context: Arc::new(ContextStack::new()),
            bootstrappers,
            cache_path: self.cache_path,
            env_path: self.env_path,
            config_sources: self.config_sources,
            providers: self.providers,
            discover_providers: self.discover_providers,
            container_loader: self.container_loader,
            booted: false,
        })
    }
}
