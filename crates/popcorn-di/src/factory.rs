//! Service factories

use std::sync::Arc;

use crate::container::ServiceContainer;
use crate::error::ContainerResult;
use crate::key::Instance;

/// Builds instances of `T` by hand instead of autowiring.
///
/// Returning `Ok(None)` means no instance is available, which the container
/// reports as an unresolvable service.
pub trait ServiceFactory<T: ?Sized>: Send + Sync {
    fn make(&self, container: &ServiceContainer) -> ContainerResult<Option<Arc<T>>>;
}

pub(crate) type ErasedFactory =
    Arc<dyn Fn(&ServiceContainer) -> ContainerResult<Option<Instance>> + Send + Sync>;

pub(crate) fn erase<T, F>(factory: F) -> ErasedFactory
where
    T: ?Sized + Send + Sync + 'static,
    F: ServiceFactory<T> + 'static,
{
    Arc::new(
        move |container: &ServiceContainer| -> ContainerResult<Option<Instance>> {
            Ok(factory.make(container)?.map(Instance::new))
        },
    )
}

pub(crate) fn erase_fn<T, F>(factory: F) -> ErasedFactory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&ServiceContainer) -> ContainerResult<Option<Arc<T>>> + Send + Sync + 'static,
{
    Arc::new(
        move |container: &ServiceContainer| -> ContainerResult<Option<Instance>> {
            Ok(factory(container)?.map(Instance::new))
        },
    )
}
