//! Request context resolution
//!
//! Parameters marked with [`FromContext`] are resolved from the context of
//! the request in flight instead of the container.
//!
//! ```rust,ignore
//! ParameterDescriptor::dependency::<User>("user").with_marker(FromContext)
//! ```

use popcorn_di::{
    ArgumentResolver, ContainerError, ContainerResult, DeclaredType, Instance, Marker,
    ParameterDescriptor, ServiceContainer,
};
use tracing::trace;

use crate::request::Request;

/// Resolve this parameter from the current request's context.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromContext;

impl Marker for FromContext {}

#[derive(Debug, Default)]
pub struct ContextResolver;

impl ArgumentResolver for ContextResolver {
    fn resolve(
        &self,
        parameter: &ParameterDescriptor,
        container: &ServiceContainer,
    ) -> ContainerResult<Option<Instance>> {
        let DeclaredType::Service { key, .. } = parameter.declared() else {
            return Err(ContainerError::invalid_argument(
                parameter.name(),
                "invalid parameter type for context",
            ));
        };

        let request = container.get::<Request>()?;
        match request.context_stack().get_key(*key) {
            Some(instance) => {
                trace!("Resolved '{}' from the request context", parameter.name());
                Ok(Some(instance))
            }
            None if parameter.accepts_absent() => Ok(None),
            None => Err(ContainerError::ContextNotSet { context: *key }),
        }
    }
}
