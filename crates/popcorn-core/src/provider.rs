//! Core Service Provider
//!
//! Registers the services every application has: the active runtime and the
//! application's context stack.

use std::sync::Arc;

use popcorn_di::{
    keys, ContainerResult, ContextStack, ServiceCollector, ServiceContainer, ServiceFactory,
    ServiceProvider,
};

use crate::runtime::Runtime;

/// Hands out the application's runtime.
pub struct RuntimeServiceFactory {
    runtime: Arc<dyn Runtime>,
}

impl RuntimeServiceFactory {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }
}

impl ServiceFactory<dyn Runtime> for RuntimeServiceFactory {
    fn make(&self, _container: &ServiceContainer) -> ContainerResult<Option<Arc<dyn Runtime>>> {
        Ok(Some(self.runtime.clone()))
    }
}

pub struct CoreServiceProvider {
    runtime: Arc<dyn Runtime>,
    context: Arc<ContextStack>,
}

impl CoreServiceProvider {
    pub fn new(runtime: Arc<dyn Runtime>, context: Arc<ContextStack>) -> Self {
        Self { runtime, context }
    }

    fn register_runtime(&self, collector: &mut ServiceCollector) {
        // Always taken from the application, never built or cached.
        collector
            .not_shared(keys![dyn Runtime])
            .not_autowired(keys![dyn Runtime])
            .factory_from::<dyn Runtime, _>(RuntimeServiceFactory::new(self.runtime.clone()), false);
    }

    fn register_context(&self, collector: &mut ServiceCollector) {
        let context = self.context.clone();
        collector
            .not_autowired(keys![ContextStack])
            .factory::<ContextStack, _>(move |_| Ok(Some(context.clone())), true);
    }
}

impl ServiceProvider for CoreServiceProvider {
    fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()> {
        self.register_runtime(collector);
        self.register_context(collector);
        Ok(())
    }
}
