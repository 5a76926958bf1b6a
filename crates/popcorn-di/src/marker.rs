//! Declarative parameter markers
//!
//! A marker is a plain value attached to a parameter descriptor. Resolvers are
//! registered against a marker type, and a parameter matches a resolver when one
//! of its tags *is an instance of* that marker: either the same type, or a type
//! that declares the marker among its parents.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::ServiceKey;

/// A type usable as a parameter marker.
pub trait Marker: Any + Send + Sync {
    /// Marker types this marker is also an instance of.
    fn parents(&self) -> Vec<ServiceKey> {
        Vec::new()
    }
}

/// A marker value attached to a parameter.
#[derive(Clone)]
pub struct MarkerTag {
    key: ServiceKey,
    parents: Vec<ServiceKey>,
    value: Arc<dyn Any + Send + Sync>,
}

impl MarkerTag {
    pub fn new<M: Marker>(marker: M) -> Self {
        Self {
            key: ServiceKey::of::<M>(),
            parents: marker.parents(),
            value: Arc::new(marker),
        }
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn is_instance_of(&self, marker: ServiceKey) -> bool {
        self.key == marker || self.parents.contains(&marker)
    }

    /// The marker value, for resolvers that read marker arguments.
    pub fn downcast_ref<M: Marker>(&self) -> Option<&M> {
        self.value.downcast_ref::<M>()
    }
}

impl fmt::Debug for MarkerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerTag")
            .field("key", &self.key)
            .field("parents", &self.parents)
            .finish()
    }
}
