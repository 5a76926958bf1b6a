//! Set-once context values
//!
//! A [`ContextStack`] holds at most one value per type. A value stays until it
//! is forgotten or the stack is reset; setting it again before that is an
//! error. The stack is injected into the container as an ordinary instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{ContainerError, ContainerResult};
use crate::key::{Instance, ServiceKey};

#[derive(Debug, Default)]
pub struct ContextStack {
    entries: RwLock<HashMap<ServiceKey, Instance>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let context = ServiceKey::of::<T>();
        self.get_key(context)
            .ok_or(ContainerError::ContextNotSet { context })?
            .downcast_checked::<T>()
    }

    pub fn get_key(&self, key: ServiceKey) -> Option<Instance> {
        self.entries.read().get(&key).cloned()
    }

    pub fn set<T>(&self, value: Arc<T>) -> ContainerResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.set_instance(Instance::new(value))
    }

    pub fn set_instance(&self, instance: Instance) -> ContainerResult<&Self> {
        let context = instance.key();
        let mut entries = self.entries.write();

        if entries.contains_key(&context) {
            return Err(ContainerError::ContextAlreadySet { context });
        }

        entries.insert(context, instance);
        trace!("Set context {}", context);
        Ok(self)
    }

    pub fn has<T: ?Sized + 'static>(&self) -> bool {
        self.entries.read().contains_key(&ServiceKey::of::<T>())
    }

    /// Remove the value for `T`. Returns whether one was set.
    pub fn forget<T: ?Sized + 'static>(&self) -> bool {
        self.forget_key(ServiceKey::of::<T>())
    }

    pub fn forget_key(&self, key: ServiceKey) -> bool {
        self.entries.write().remove(&key).is_some()
    }

    pub fn reset(&self) -> &Self {
        self.entries.write().clear();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
