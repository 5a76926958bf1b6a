//! End-to-end tests for a small blog application
//!
//! The application loads its environment and config from files, registers
//! services through providers and answers requests through the HTTP runtime.

use std::path::Path;
use std::sync::Arc;

use popcorn_core::{AppConfig, CoreError, EnvVars, Popcorn, Runtime};
use popcorn_di::{
    bind, keys, Arguments, ContainerError, ContainerResult, Function, Injectable,
    ParameterDescriptor, ServiceCollector, ServiceProvider,
};
use popcorn_http::{FromContext, HttpRuntime, HttpServiceProvider, Request, RequestMethod};
use proptest::prelude::*;
use serde::Deserialize;

// ============================================================================
// Application
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlogConfig {
    site_name: String,
    posts: Vec<String>,
}

trait PostRepository: Send + Sync {
    fn title(&self, id: usize) -> Option<String>;
}

struct ConfiguredPosts {
    posts: Vec<String>,
}

impl PostRepository for ConfiguredPosts {
    fn title(&self, id: usize) -> Option<String> {
        self.posts.get(id).cloned()
    }
}

impl Injectable for ConfiguredPosts {
    fn parameters() -> Vec<ParameterDescriptor> {
        vec![ParameterDescriptor::dependency::<BlogConfig>("config")]
    }

    fn construct(arguments: Arguments) -> ContainerResult<Self> {
        let config = arguments.service::<BlogConfig>("config")?;
        Ok(Self {
            posts: config.posts.clone(),
        })
    }
}

struct Author {
    name: String,
}

struct PostController {
    site_name: String,
    posts: Arc<dyn PostRepository>,
}

impl PostController {
    fn show(&self, request: &Request, author: Option<&Author>) -> String {
        let id = request
            .query("id")
            .and_then(|id| id.parse().ok())
            .unwrap_or(0);
        let title = self
            .posts
            .title(id)
            .unwrap_or_else(|| "not found".to_string());
        let author = author.map_or("anonymous", |author| author.name.as_str());

        format!("{}: {} (viewed by {})", self.site_name, title, author)
    }
}

impl Injectable for PostController {
    fn parameters() -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::dependency::<BlogConfig>("config"),
            ParameterDescriptor::dependency::<dyn PostRepository>("posts"),
        ]
    }

    fn construct(arguments: Arguments) -> ContainerResult<Self> {
        Ok(Self {
            site_name: arguments.service::<BlogConfig>("config")?.site_name.clone(),
            posts: arguments.service("posts")?,
        })
    }
}

struct BlogServiceProvider;

impl ServiceProvider for BlogServiceProvider {
    fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()> {
        collector
            .autowire::<ConfiguredPosts>()
            .autowire::<PostController>()
            .scoped(keys![PostController]);
        bind!(collector, dyn PostRepository => ConfiguredPosts);
        Ok(())
    }
}

fn show_post() -> Function<String> {
    Function::new("show_post", |arguments| {
        let controller = arguments.service::<PostController>("controller")?;
        let request = arguments.service::<Request>("request")?;
        let author = arguments.optional::<Author>("author")?;
        Ok(controller.show(&request, author.as_deref()))
    })
    .parameter(ParameterDescriptor::service::<PostController>("controller"))
    .parameter(ParameterDescriptor::dependency::<Request>("request"))
    .parameter(
        ParameterDescriptor::dependency::<Author>("author")
            .with_marker(FromContext)
            .optional(),
    )
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn boot_blog(dir: &Path, runtime: Arc<HttpRuntime>) -> anyhow::Result<Popcorn> {
    let env = write(
        dir,
        ".env",
        "POPCORN_SITE_NAME=Kernel Notes\nBLOG_THEME=dark\n",
    );
    let blog = write(
        dir,
        "blog.toml",
        "site_name = \"Untitled\"\nposts = [\"Hello\", \"Ownership\", \"Lifetimes\"]\n",
    );
    let app = write(dir, "app.toml", "environment = \"testing\"\n");

    let mut popcorn = Popcorn::builder()
        .use_cache_in(dir.join("cache"))
        .load_env_from(env)
        .load_config_from::<AppConfig>(app)
        .load_config_from::<BlogConfig>(blog)
        .using_provider(HttpServiceProvider)
        .using_provider(BlogServiceProvider)
        .with_runtime(runtime)
        .build()?;
    popcorn.boot()?;
    Ok(popcorn)
}

fn get(uri: &str) -> Request {
    Request::builder()
        .method(RequestMethod::Get)
        .uri(uri)
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_serves_post_through_application() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let runtime = Arc::new(HttpRuntime::new().with_handler(show_post()));
    let popcorn = boot_blog(dir.path(), runtime.clone())?;

    runtime.set_request(
        Request::builder()
            .method(RequestMethod::Get)
            .uri("/posts?id=1")
            .context(Arc::new(Author {
                name: "ferris".to_string(),
            }))
            .build()?,
    );
    popcorn.run()?;

    assert_eq!(
        runtime.take_response().as_deref(),
        Some("Kernel Notes: Ownership (viewed by ferris)")
    );
    Ok(())
}

#[test]
fn test_anonymous_reader() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let runtime = Arc::new(HttpRuntime::new().with_handler(show_post()));
    let popcorn = boot_blog(dir.path(), runtime.clone())?;

    runtime.set_request(get("/posts?id=7"));
    popcorn.run()?;

    assert_eq!(
        runtime.take_response().as_deref(),
        Some("Kernel Notes: not found (viewed by anonymous)")
    );
    Ok(())
}

#[test]
fn test_boot_wires_environment_and_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let popcorn = boot_blog(dir.path(), Arc::new(HttpRuntime::new()))?;
    let container = popcorn.container()?;

    let env = container.get::<EnvVars>()?;
    assert_eq!(env.get("BLOG_THEME"), Some("dark"));

    let app = container.get::<AppConfig>()?;
    assert_eq!(app.environment, "testing");

    let repository = container.get::<dyn PostRepository>()?;
    assert_eq!(repository.title(2).as_deref(), Some("Lifetimes"));
    assert!(Arc::ptr_eq(
        &repository,
        &container.get::<dyn PostRepository>()?
    ));

    assert_eq!(container.get::<dyn Runtime>()?.name(), "http");
    assert!(dir.path().join("cache").join("registry.json").is_file());
    Ok(())
}

#[test]
fn test_controller_is_scoped_to_request() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let runtime = Arc::new(HttpRuntime::new());
    let popcorn = boot_blog(dir.path(), runtime.clone())?;
    let container = popcorn.container()?;

    runtime.handle(container, get("/posts"), &show_post())?;

    assert!(!container.resolved::<PostController>());
    assert!(container.resolved::<ConfiguredPosts>());
    Ok(())
}

#[test]
fn test_request_outside_handler_is_unresolvable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let popcorn = boot_blog(dir.path(), Arc::new(HttpRuntime::new()))?;

    assert!(matches!(
        popcorn.container()?.get::<Request>(),
        Err(ContainerError::Unresolvable { .. })
    ));
    Ok(())
}

#[test]
fn test_run_without_request_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let runtime = Arc::new(HttpRuntime::new().with_handler(show_post()));
    let popcorn = boot_blog(dir.path(), runtime)?;

    assert!(matches!(
        popcorn.run(),
        Err(CoreError::Runtime { runtime: "http", .. })
    ));
    Ok(())
}

proptest! {
    #[test]
    fn every_configured_post_is_served(id in 0usize..3) {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(HttpRuntime::new());
        let popcorn = boot_blog(dir.path(), runtime.clone()).unwrap();
        let container = popcorn.container().unwrap();

        let response = runtime
            .handle(container, get(&format!("/posts?id={}", id)), &show_post())
            .unwrap();
        let expected = ["Hello", "Ownership", "Lifetimes"][id];

        prop_assert!(response.starts_with("Kernel Notes: "));
        prop_assert!(response.contains(expected));
    }
}
