//! The HTTP runtime
//!
//! One request is in flight at a time. While it is, the request is available
//! from the container as [`Request`]; when handling ends, on success or
//! failure, the request is cleared and the container's scope is flushed.

use std::any::Any;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use popcorn_core::{CoreError, CoreResult, Popcorn, Runtime};
use popcorn_di::{Function, ServiceContainer};
use tracing::{debug, info};

use crate::error::{HttpError, HttpResult};
use crate::request::Request;

/// Handler called by [`Runtime::run`], returning the response body.
pub type RequestHandler = Function<String>;

#[derive(Default)]
pub struct HttpRuntime {
    handler: Option<RequestHandler>,
    pending: Mutex<Option<Request>>,
    current: RwLock<Option<Arc<Request>>>,
    response: Mutex<Option<String>>,
}

impl HttpRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: RequestHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// The HTTP runtime of an application, if it runs one.
    pub fn of(popcorn: &Popcorn) -> Option<&HttpRuntime> {
        popcorn.runtime().as_any().downcast_ref::<HttpRuntime>()
    }

    /// Queue the request handled by the next [`Runtime::run`].
    pub fn set_request(&self, request: Request) -> &Self {
        *self.pending.lock() = Some(request);
        self
    }

    /// The request being handled right now.
    pub fn request(&self) -> Option<Arc<Request>> {
        self.current.read().clone()
    }

    /// Response body produced by the last [`Runtime::run`].
    pub fn take_response(&self) -> Option<String> {
        self.response.lock().take()
    }

    /// Handle a request by calling `handler` through the container.
    pub fn handle<R>(
        &self,
        container: &ServiceContainer,
        request: Request,
        handler: &Function<R>,
    ) -> HttpResult<R> {
        let _in_flight = InFlight::enter(self, container, request)?;
        Ok(container.call(handler)?)
    }
}

impl Runtime for HttpRuntime {
    fn name(&self) -> &'static str {
        "http"
    }

    fn boot(&self, _container: &ServiceContainer) -> CoreResult<()> {
        debug!("HTTP runtime booted");
        Ok(())
    }

    fn run(&self, container: &ServiceContainer) -> CoreResult<()> {
        let http_error = |error: HttpError| CoreError::runtime(self.name(), error);

        let request = self.pending.lock().take().ok_or_else(|| http_error(HttpError::NoRequest))?;
        let handler = self.handler.as_ref().ok_or_else(|| http_error(HttpError::NoHandler))?;

        let response = self.handle(container, request, handler).map_err(http_error)?;
        *self.response.lock() = Some(response);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marks a request in flight until dropped.
struct InFlight<'a> {
    runtime: &'a HttpRuntime,
    container: &'a ServiceContainer,
}

impl<'a> InFlight<'a> {
    fn enter(
        runtime: &'a HttpRuntime,
        container: &'a ServiceContainer,
        request: Request,
    ) -> HttpResult<Self> {
        let mut current = runtime.current.write();
        if current.is_some() {
            return Err(HttpError::RequestInFlight);
        }

        info!("{} {}", request.method(), request.path());
        *current = Some(Arc::new(request));
        Ok(Self { runtime, container })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.runtime.current.write().take();
        self.container.flush_scope();
    }
}
