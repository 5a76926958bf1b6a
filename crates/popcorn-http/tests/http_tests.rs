//! Requests, request context and the HTTP runtime
use std::any::Any;
use std::sync::Arc;

use popcorn_core::{CoreError, CoreResult, CoreServiceProvider, Popcorn, Runtime};
use popcorn_di::{
    injectable, keys, ContainerError, ContainerResult, ContextStack, Function,
    ParameterDescriptor, ServiceCollector, ServiceContainer, ServiceKey, ServiceProvider,
};
use popcorn_http::*;

#[derive(Debug)]
struct User {
    name: &'static str,
}

#[derive(Default)]
struct Session;

injectable!(Session);

struct ConsoleRuntime;

impl Runtime for ConsoleRuntime {
    fn name(&self) -> &'static str {
        "console"
    }

    fn run(&self, _container: &ServiceContainer) -> CoreResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SessionProvider;

impl ServiceProvider for SessionProvider {
    fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()> {
        collector.autowire::<Session>().scoped(keys![Session]);
        Ok(())
    }
}

fn container_for(runtime: Arc<dyn Runtime>) -> ServiceContainer {
    let mut collector = ServiceCollector::new();
    collector
        .collect(&CoreServiceProvider::new(runtime, Arc::new(ContextStack::new())))
        .unwrap()
        .collect(&HttpServiceProvider)
        .unwrap()
        .collect(&SessionProvider)
        .unwrap();
    collector.into_container().unwrap()
}

fn get(uri: &str) -> Request {
    Request::builder()
        .method(RequestMethod::Get)
        .uri(uri)
        .build()
        .unwrap()
}

fn get_as(uri: &str, name: &'static str) -> Request {
    Request::builder()
        .method(RequestMethod::Get)
        .uri(uri)
        .context(Arc::new(User { name }))
        .build()
        .unwrap()
}

fn show_user() -> RequestHandler {
    Function::new("show_user", |arguments| {
        let request = arguments.service::<Request>("request")?;
        let user = arguments.service::<User>("user")?;
        Ok(format!("{} {}", request.path(), user.name))
    })
    .parameter(ParameterDescriptor::dependency::<Request>("request"))
    .parameter(ParameterDescriptor::dependency::<User>("user").with_marker(FromContext))
}

// ============================================================================
// Request service
// ============================================================================

#[test]
fn test_request_is_resolvable_while_handling() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let handler = Function::new("path", |arguments| {
        Ok(arguments.service::<Request>("request")?.path().to_string())
    })
    .parameter(ParameterDescriptor::dependency::<Request>("request"));

    let path = runtime.handle(&container, get("/users/7"), &handler).unwrap();
    assert_eq!(path, "/users/7");
}

#[test]
fn test_request_is_unresolvable_without_request_in_flight() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    assert!(matches!(
        container.get::<Request>(),
        Err(ContainerError::Unresolvable { source: None, .. })
    ));

    let handler = Function::new("noop", |_| Ok(()));
    runtime.handle(&container, get("/"), &handler).unwrap();

    assert!(container.get::<Request>().is_err());
    assert!(!container.resolved::<Request>());
}

#[test]
fn test_request_requires_http_runtime() {
    let container = container_for(Arc::new(ConsoleRuntime));

    match container.get::<Request>() {
        Err(ContainerError::Factory { service, message }) => {
            assert_eq!(service, ServiceKey::of::<Request>());
            assert!(message.contains("outside the HTTP context"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_each_request_is_resolved_fresh() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());
    let handler = Function::new("path", |arguments| {
        Ok(arguments.service::<Request>("request")?.path().to_string())
    })
    .parameter(ParameterDescriptor::dependency::<Request>("request"));

    assert_eq!(runtime.handle(&container, get("/a"), &handler).unwrap(), "/a");
    assert_eq!(runtime.handle(&container, get("/b"), &handler).unwrap(), "/b");
}

// ============================================================================
// Request context
// ============================================================================

#[test]
fn test_from_context_reads_request_context() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let response = runtime
        .handle(&container, get_as("/profile", "ada"), &show_user())
        .unwrap();
    assert_eq!(response, "/profile ada");
}

#[test]
fn test_from_context_missing_value() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let result = runtime.handle(&container, get("/profile"), &show_user());
    match result {
        Err(HttpError::Container(ContainerError::ContextNotSet { context })) => {
            assert_eq!(context, ServiceKey::of::<User>());
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_from_context_optional_value() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let handler = Function::new("greet", |arguments| {
        let user = arguments.optional::<User>("user")?;
        Ok(user.map_or("guest", |user| user.name).to_string())
    })
    .parameter(
        ParameterDescriptor::dependency::<User>("user")
            .with_marker(FromContext)
            .optional(),
    );

    assert_eq!(runtime.handle(&container, get("/"), &handler).unwrap(), "guest");
    assert_eq!(
        runtime.handle(&container, get_as("/", "grace"), &handler).unwrap(),
        "grace"
    );
}

#[test]
fn test_from_context_rejects_non_service_parameters() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let handler = Function::new("page", |arguments| arguments.value::<u32>("page"))
        .parameter(ParameterDescriptor::scalar::<u32>("page").with_marker(FromContext));

    assert!(matches!(
        runtime.handle(&container, get("/"), &handler),
        Err(HttpError::Container(ContainerError::InvalidArgument { .. }))
    ));
}

#[test]
fn test_from_context_outside_http_runtime() {
    let container = container_for(Arc::new(ConsoleRuntime));

    let handler = Function::new("whoami", |arguments| {
        Ok(arguments.service::<User>("user")?.name)
    })
    .parameter(ParameterDescriptor::dependency::<User>("user").with_marker(FromContext));

    assert!(matches!(
        container.call(&handler),
        Err(ContainerError::Factory { .. })
    ));
}

// ============================================================================
// Runtime
// ============================================================================

#[test]
fn test_scope_is_flushed_after_each_request() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let handler = Function::new("session", |arguments| {
        arguments.service::<Session>("session")?;
        Ok(())
    })
    .parameter(ParameterDescriptor::service::<Session>("session"));

    runtime.handle(&container, get("/"), &handler).unwrap();
    assert!(!container.resolved::<Session>());
}

#[test]
fn test_scope_is_flushed_when_handler_fails() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = container_for(runtime.clone());

    let handler: Function<()> = Function::new("broken", |arguments| {
        arguments.service::<Session>("session")?;
        Err(ContainerError::factory(ServiceKey::of::<Session>(), "boom"))
    })
    .parameter(ParameterDescriptor::service::<Session>("session"));

    assert!(runtime.handle(&container, get("/"), &handler).is_err());
    assert!(!container.resolved::<Session>());
    assert!(runtime.request().is_none());
}

#[test]
fn test_one_request_in_flight_at_a_time() {
    let runtime = Arc::new(HttpRuntime::new());
    let container = Arc::new(container_for(runtime.clone()));

    let inner_runtime = runtime.clone();
    let inner_container = container.clone();
    let handler = Function::new("nested", move |_| {
        let inner = Function::new("inner", |_| Ok(()));
        let result = inner_runtime.handle(&inner_container, get("/inner"), &inner);
        Ok(matches!(result, Err(HttpError::RequestInFlight)))
    });

    assert!(runtime.handle(&container, get("/outer"), &handler).unwrap());
    assert!(runtime.request().is_none());
}

#[test]
fn test_application_runs_queued_request() {
    let runtime = Arc::new(HttpRuntime::new().with_handler(show_user()));

    let mut popcorn = Popcorn::builder()
        .using_provider(HttpServiceProvider)
        .with_runtime(runtime.clone())
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    let http = HttpRuntime::of(&popcorn).unwrap();
    http.set_request(get_as("/me", "linus"));
    popcorn.run().unwrap();

    assert_eq!(runtime.take_response().as_deref(), Some("/me linus"));
    assert!(runtime.take_response().is_none());
}

#[test]
fn test_application_run_reports_handler_failure() {
    let runtime = Arc::new(HttpRuntime::new().with_handler(show_user()));

    let mut popcorn = Popcorn::builder()
        .using_provider(HttpServiceProvider)
        .with_runtime(runtime.clone())
        .build()
        .unwrap();
    popcorn.boot().unwrap();

    runtime.set_request(get("/me"));
    assert!(matches!(
        popcorn.run(),
        Err(CoreError::Runtime { runtime: "http", .. })
    ));
    assert!(runtime.take_response().is_none());
}
