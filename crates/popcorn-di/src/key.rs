//! Service keys and type-erased instances

use std::any::{type_name, Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};

/// Identifies a requestable service: a concrete type or a trait object.
///
/// Two keys are equal when they name the same type. The type name is kept
/// only for diagnostics.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// Key for `T`, which may be unsized (`dyn Trait`).
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for ServiceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A resolved service, type-erased.
///
/// Wraps the `Arc<T>` handed out by the container so that trait objects can
/// be stored next to concrete types. Cloning is cheap and keeps identity.
#[derive(Clone)]
pub struct Instance {
    key: ServiceKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: ServiceKey::of::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn of<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::new(Arc::new(value))
    }

    /// Key of the type this instance was created for.
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + 'static,
    {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    pub(crate) fn downcast_checked<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + 'static,
    {
        self.downcast::<T>().ok_or_else(|| ContainerError::TypeMismatch {
            expected: ServiceKey::of::<T>(),
            actual: self.key,
        })
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.value.is::<Arc<T>>()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.key.name)
    }
}
