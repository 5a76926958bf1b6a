//! HTTP Service Provider

use std::sync::Arc;

use popcorn_core::Runtime;
use popcorn_di::{
    keys, ContainerError, ContainerResult, ServiceCollector, ServiceContainer, ServiceFactory,
    ServiceKey, ServiceProvider,
};

use crate::context::{ContextResolver, FromContext};
use crate::request::Request;
use crate::runtime::HttpRuntime;

/// Hands out the request in flight.
///
/// Fails outside the HTTP runtime, and resolves to nothing while no request
/// is being handled.
#[derive(Debug, Default)]
pub struct RequestServiceFactory;

impl ServiceFactory<Request> for RequestServiceFactory {
    fn make(&self, container: &ServiceContainer) -> ContainerResult<Option<Arc<Request>>> {
        let runtime = container.get::<dyn Runtime>()?;
        let http = runtime.as_any().downcast_ref::<HttpRuntime>().ok_or_else(|| {
            ContainerError::factory(
                ServiceKey::of::<Request>(),
                "Cannot access the request object outside the HTTP context",
            )
        })?;

        Ok(http.request())
    }
}

pub struct HttpServiceProvider;

impl ServiceProvider for HttpServiceProvider {
    fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()> {
        // Always taken from the runtime, never built or cached.
        collector
            .not_shared(keys![Request])
            .not_autowired(keys![Request])
            .factory_from::<Request, _>(RequestServiceFactory, false)
            .resolver::<FromContext, _>(Arc::new(ContextResolver));
        Ok(())
    }
}
