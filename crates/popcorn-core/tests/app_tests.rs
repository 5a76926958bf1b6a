//! Booting and running applications
use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use popcorn_core::*;
use popcorn_di::{
    injectable, ContainerResult, ContextStack, RegistryManifest, ServiceCollector,
    ServiceContainer, ServiceProvider,
};

#[derive(Default)]
struct RecordingRuntime {
    boots: AtomicUsize,
    runs: AtomicUsize,
}

impl Runtime for RecordingRuntime {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn boot(&self, container: &ServiceContainer) -> CoreResult<()> {
        // Bootstrappers have finished by now.
        container.get::<EnvVars>()?;
        self.boots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn run(&self, _container: &ServiceContainer) -> CoreResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct Clock;

injectable!(Clock);

struct AppServiceProvider;

impl ServiceProvider for AppServiceProvider {
    fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()> {
        collector.autowire::<Clock>();
        Ok(())
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn recording_runtime(popcorn: &Popcorn) -> &RecordingRuntime {
    popcorn
        .runtime()
        .as_any()
        .downcast_ref::<RecordingRuntime>()
        .unwrap()
}

// ============================================================================
// Building
// ============================================================================

#[test]
fn test_build_requires_runtime() {
    assert!(matches!(
        Popcorn::builder().build(),
        Err(CoreError::MissingRuntime)
    ));
}

#[test]
fn test_build_rejects_missing_env_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Popcorn::builder()
        .load_env_from(dir.path().join("missing.env"))
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build();

    assert!(matches!(result, Err(CoreError::EnvFileMissing { .. })));
}

#[test]
fn test_run_before_boot_has_no_container() {
    let popcorn = Popcorn::builder()
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();

    assert!(matches!(popcorn.run(), Err(CoreError::ContainerNotLoaded)));
}

// ============================================================================
// Booting
// ============================================================================

#[test]
fn test_full_boot_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let env_path = write(
        dir.path(),
        ".env",
        "POPCORN_TEST_APP_ENVIRONMENT=local\nPOPCORN_DEBUG=true\n",
    );
    let config_path = write(dir.path(), "app.toml", "environment = \"testing\"\n");

    let mut popcorn = Popcorn::builder()
        .load_env_from(&env_path)
        .load_config_from::<AppConfig>(&config_path)
        .using_provider(AppServiceProvider)
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();

    popcorn.boot().unwrap();
    popcorn.run().unwrap();

    let runtime = recording_runtime(&popcorn);
    assert_eq!(runtime.boots.load(Ordering::SeqCst), 1);
    assert_eq!(runtime.runs.load(Ordering::SeqCst), 1);

    let container = popcorn.container().unwrap();

    let env = container.get::<EnvVars>().unwrap();
    assert_eq!(env.get("POPCORN_TEST_APP_ENVIRONMENT"), Some("local"));

    let config = container.get::<AppConfig>().unwrap();
    assert_eq!(config.environment, "testing");
    assert!(config.debug);
    assert!(Arc::ptr_eq(
        &config,
        &popcorn.context().get::<AppConfig>().unwrap()
    ));

    assert!(container.get::<Clock>().is_ok());
    assert_eq!(container.get::<dyn Runtime>().unwrap().name(), "recording");
    assert!(Arc::ptr_eq(
        &container.get::<ContextStack>().unwrap(),
        popcorn.context()
    ));
    assert!(Arc::ptr_eq(
        &popcorn.context().get::<ServiceContainer>().unwrap(),
        container
    ));
    assert!(popcorn.context().has::<dyn Runtime>());
}

#[test]
fn test_boot_twice_does_nothing() {
    let mut popcorn = Popcorn::builder()
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();

    popcorn.boot().unwrap();
    popcorn.boot().unwrap();

    assert!(popcorn.is_booted());
    assert_eq!(recording_runtime(&popcorn).boots.load(Ordering::SeqCst), 1);
}

#[test]
fn test_manifest_is_written_to_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");

    let mut popcorn = Popcorn::builder()
        .use_cache_in(&cache)
        .using_provider(AppServiceProvider)
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    let json = std::fs::read_to_string(cache.join(REGISTRY_MANIFEST)).unwrap();
    let manifest = RegistryManifest::from_json(&json).unwrap();

    assert!(manifest.factories.iter().any(|name| name.contains("Runtime")));
    assert!(manifest.not_shared.iter().any(|name| name.contains("Runtime")));
    assert!(manifest.autowirable.iter().any(|name| name.ends_with("Clock")));
}

#[test]
fn test_given_container_skips_providers() {
    struct PanickingProvider;

    impl ServiceProvider for PanickingProvider {
        fn register(&self, _collector: &mut ServiceCollector) -> ContainerResult<()> {
            panic!("providers must not be collected");
        }
    }

    let mut popcorn = Popcorn::builder()
        .using_provider(PanickingProvider)
        .with_container(ServiceCollector::new().into_container().unwrap())
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    let container = popcorn.container().unwrap();
    assert!(Arc::ptr_eq(
        &container.get::<ContextStack>().unwrap(),
        popcorn.context()
    ));
    assert!(!container.has::<dyn Runtime>());
}

#[test]
fn test_custom_loader_takes_precedence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut popcorn = Popcorn::builder()
        .using_provider(AppServiceProvider)
        .load_container_using(move |_popcorn: &Popcorn| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ServiceCollector::new().into_container()?))
        })
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!popcorn.container().unwrap().has::<Clock>());
}

#[test]
fn test_custom_loader_can_defer_to_providers() {
    let mut popcorn = Popcorn::builder()
        .using_provider(AppServiceProvider)
        .load_container_using(|_popcorn: &Popcorn| Ok(None))
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    assert!(popcorn.container().unwrap().has::<Clock>());
}

#[test]
fn test_extra_bootstrappers_run_after_defaults() {
    struct CheckContext {
        seen: Arc<AtomicUsize>,
    }

    impl Bootstrapper for CheckContext {
        fn bootstrap(&self, popcorn: &mut Popcorn) -> CoreResult<()> {
            assert!(popcorn.context().has::<ServiceContainer>());
            popcorn.container()?.get::<EnvVars>()?;
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let seen = Arc::new(AtomicUsize::new(0));
    let mut popcorn = Popcorn::builder()
        .using_bootstrappers([Box::new(CheckContext { seen: seen.clone() }) as Box<dyn Bootstrapper>])
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_boot_failure_names_the_bootstrapper() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("mail.toml");

    let mut popcorn = Popcorn::builder()
        .load_config_from::<AppConfig>(&missing)
        .with_runtime(Arc::new(RecordingRuntime::default()))
        .build()
        .unwrap();

    let error = popcorn.boot().unwrap_err();
    assert!(matches!(
        error,
        CoreError::Bootstrap { bootstrapper: "load-config-objects", .. }
    ));
    assert!(render_chain(&error).contains("mail.toml"));
    assert!(!popcorn.is_booted());
    assert_eq!(recording_runtime(&popcorn).boots.load(Ordering::SeqCst), 0);
}

#[test]
fn test_boot_can_be_retried_after_runtime_failure() {
    #[derive(Default)]
    struct WarmingRuntime {
        attempts: AtomicUsize,
    }

    impl Runtime for WarmingRuntime {
        fn name(&self) -> &'static str {
            "warming"
        }

        fn boot(&self, _container: &ServiceContainer) -> CoreResult<()> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CoreError::env("WARM", "is not ready"));
            }
            Ok(())
        }

        fn run(&self, _container: &ServiceContainer) -> CoreResult<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let config_path = write(dir.path(), "app.toml", "environment = \"staging\"\n");

    let mut popcorn = Popcorn::builder()
        .load_config_from::<AppConfig>(&config_path)
        .with_runtime(Arc::new(WarmingRuntime::default()))
        .build()
        .unwrap();

    assert!(popcorn.boot().is_err());
    assert!(!popcorn.is_booted());

    popcorn.boot().unwrap();
    assert!(popcorn.is_booted());

    let container = popcorn.container().unwrap();
    assert!(Arc::ptr_eq(
        &popcorn.context().get::<ServiceContainer>().unwrap(),
        container
    ));
    assert!(Arc::ptr_eq(
        &popcorn.context().get::<AppConfig>().unwrap(),
        &container.get::<AppConfig>().unwrap()
    ));
    assert_eq!(popcorn.context().get::<AppConfig>().unwrap().environment, "staging");
}
