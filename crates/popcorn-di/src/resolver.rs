//! Parameter resolvers
//!
//! Every parameter is resolved by exactly one [`ArgumentResolver`]: the first
//! marker-keyed resolver whose marker the parameter carries, or the container's
//! default resolver. Context-aware resolvers are told which function they are
//! resolving for, and the context is flushed again on every exit path.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::debug;

use crate::container::ServiceContainer;
use crate::descriptor::{DeclaredType, ParameterDescriptor};
use crate::error::{ContainerError, ContainerResult};
use crate::key::{Instance, ServiceKey};

/// The function a parameter belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub function: String,
    pub service: Option<ServiceKey>,
}

impl CallContext {
    pub fn new(function: impl Into<String>, service: Option<ServiceKey>) -> Self {
        Self {
            function: function.into(),
            service,
        }
    }

    pub(crate) fn constructor(service: ServiceKey) -> Self {
        Self::new("construct", Some(service))
    }
}

/// Resolves a single parameter.
///
/// `Ok(None)` is an absent value for a parameter that accepts one.
pub trait ArgumentResolver: Send + Sync {
    fn resolve(
        &self,
        parameter: &ParameterDescriptor,
        container: &ServiceContainer,
    ) -> ContainerResult<Option<Instance>>;

    /// Returns `Some` when the resolver wants the current call context.
    fn context_aware(&self) -> Option<&dyn ContextAwareArgumentResolver> {
        None
    }
}

/// A resolver that reads the function and service it is resolving for.
pub trait ContextAwareArgumentResolver: Send + Sync {
    fn set_context(&self, context: CallContext);

    fn flush_context(&self);
}

/// Sets a resolver's context and flushes it when dropped.
pub(crate) struct ContextGuard<'a> {
    resolver: Option<&'a dyn ContextAwareArgumentResolver>,
}

impl<'a> ContextGuard<'a> {
    pub(crate) fn enter(resolver: &'a dyn ArgumentResolver, context: &CallContext) -> Self {
        let resolver = resolver.context_aware();
        if let Some(resolver) = resolver {
            resolver.set_context(context.clone());
        }
        Self { resolver }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(resolver) = self.resolver {
            resolver.flush_context();
        }
    }
}

/// Default, type-driven resolver.
///
/// Contexts are kept per thread as a stack so that a nested resolution
/// restores the outer context when it is flushed.
#[derive(Debug, Default)]
pub struct StandardArgumentResolver {
    contexts: Mutex<HashMap<ThreadId, Vec<CallContext>>>,
}

impl StandardArgumentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context of the innermost resolution on the calling thread.
    pub fn current_context(&self) -> Option<CallContext> {
        self.contexts
            .lock()
            .get(&thread::current().id())
            .and_then(|stack| stack.last().cloned())
    }

    fn failure(
        &self,
        parameter: &ParameterDescriptor,
        source: Option<ContainerError>,
    ) -> ContainerError {
        let context = self.current_context();
        ContainerError::UnresolvableParameter {
            parameter: parameter.name().to_string(),
            function: context
                .as_ref()
                .map(|context| context.function.clone())
                .unwrap_or_default(),
            service: context.and_then(|context| context.service),
            source: source.map(Box::new),
        }
    }
}

impl ArgumentResolver for StandardArgumentResolver {
    fn resolve(
        &self,
        parameter: &ParameterDescriptor,
        container: &ServiceContainer,
    ) -> ContainerResult<Option<Instance>> {
        let mut source = None;

        match parameter.declared() {
            DeclaredType::Intersection(_) => return Err(self.failure(parameter, None)),
            DeclaredType::Service { key, descriptor } => {
                if let Some(descriptor) = descriptor {
                    container.register_descriptor(*descriptor);
                }

                match container.get_key(*key) {
                    Ok(instance) => return Ok(Some(instance)),
                    Err(error) if error.is_circular() => {
                        return Err(self.failure(parameter, Some(error)))
                    }
                    Err(error) => {
                        debug!(
                            "Parameter '{}' could not be resolved by type: {}",
                            parameter.name(),
                            error
                        );
                        source = Some(error);
                    }
                }
            }
            DeclaredType::Builtin(_) | DeclaredType::Union(_) => {}
        }

        if let Some(default) = parameter.default_value() {
            return Ok(Some(default.clone()));
        }

        if parameter.accepts_absent() {
            return Ok(None);
        }

        Err(self.failure(parameter, source))
    }

    fn context_aware(&self) -> Option<&dyn ContextAwareArgumentResolver> {
        Some(self)
    }
}

impl ContextAwareArgumentResolver for StandardArgumentResolver {
    fn set_context(&self, context: CallContext) {
        self.contexts
            .lock()
            .entry(thread::current().id())
            .or_default()
            .push(context);
    }

    fn flush_context(&self) {
        let mut contexts = self.contexts.lock();
        let id = thread::current().id();
        if let Some(stack) = contexts.get_mut(&id) {
            stack.pop();
            if stack.is_empty() {
                contexts.remove(&id);
            }
        }
    }
}
