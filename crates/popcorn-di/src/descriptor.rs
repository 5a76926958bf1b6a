//! Type and parameter descriptors
//!
//! Rust has no runtime reflection, so types that can be autowired describe
//! their constructor through [`Injectable`]. The container reads the ordered
//! [`ParameterDescriptor`] list, resolves each parameter, and hands the
//! resulting [`Arguments`] back to [`Injectable::construct`].
//!
//! ```rust,ignore
//! struct Mailer {
//!     transport: Arc<dyn Transport>,
//!     retries: u32,
//! }
//!
//! impl Injectable for Mailer {
//!     fn parameters() -> Vec<ParameterDescriptor> {
//!         vec![
//!             ParameterDescriptor::dependency::<dyn Transport>("transport"),
//!             ParameterDescriptor::scalar::<u32>("retries").with_default(3_u32),
//!         ]
//!     }
//!
//!     fn construct(arguments: Arguments) -> ContainerResult<Self> {
//!         Ok(Self {
//!             transport: arguments.service("transport")?,
//!             retries: arguments.value("retries")?,
//!         })
//!     }
//! }
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};
use crate::key::{Instance, ServiceKey};
use crate::marker::{Marker, MarkerTag};

/// A type the container can construct by resolving its parameters.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Constructor parameters, in declaration order.
    fn parameters() -> Vec<ParameterDescriptor> {
        Vec::new()
    }

    fn construct(arguments: Arguments) -> ContainerResult<Self>;
}

#[derive(Clone, Copy)]
enum DescriptorKind {
    Constructible {
        parameters: fn() -> Vec<ParameterDescriptor>,
        construct: fn(Arguments) -> ContainerResult<Instance>,
    },
    Abstract,
}

/// Describes how (and whether) a type can be constructed.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    key: ServiceKey,
    kind: DescriptorKind,
}

impl TypeDescriptor {
    pub fn of<T: Injectable>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            kind: DescriptorKind::Constructible {
                parameters: T::parameters,
                construct: construct_erased::<T>,
            },
        }
    }

    /// A known type that cannot be constructed directly, such as a trait object.
    pub fn abstract_of<T: ?Sized + 'static>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            kind: DescriptorKind::Abstract,
        }
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn is_constructible(&self) -> bool {
        matches!(self.kind, DescriptorKind::Constructible { .. })
    }

    pub fn parameters(&self) -> Vec<ParameterDescriptor> {
        match self.kind {
            DescriptorKind::Constructible { parameters, .. } => parameters(),
            DescriptorKind::Abstract => Vec::new(),
        }
    }

    pub fn construct(&self, arguments: Arguments) -> ContainerResult<Instance> {
        match self.kind {
            DescriptorKind::Constructible { construct, .. } => construct(arguments),
            DescriptorKind::Abstract => Err(ContainerError::NotInstantiable { service: self.key }),
        }
    }
}

fn construct_erased<T: Injectable>(arguments: Arguments) -> ContainerResult<Instance> {
    T::construct(arguments).map(Instance::of)
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("constructible", &self.is_constructible())
            .finish()
    }
}

/// The declared type of a parameter.
#[derive(Debug, Clone)]
pub enum DeclaredType {
    /// A single service type, resolved through the container.
    Service {
        key: ServiceKey,
        /// Present when the type is itself autowirable.
        descriptor: Option<TypeDescriptor>,
    },
    /// A plain value type that is never looked up in the container.
    Builtin(ServiceKey),
    /// Any one of several types. Only defaults and absence apply.
    Union(Vec<ServiceKey>),
    /// All of several types at once. Not supported.
    Intersection(Vec<ServiceKey>),
}

/// One constructor or function parameter.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    name: &'static str,
    declared: DeclaredType,
    default: Option<Instance>,
    markers: Vec<MarkerTag>,
    accepts_absent: bool,
}

impl ParameterDescriptor {
    fn new(name: &'static str, declared: DeclaredType) -> Self {
        Self {
            name,
            declared,
            default: None,
            markers: Vec::new(),
            accepts_absent: false,
        }
    }

    /// An autowirable service parameter.
    pub fn service<T: Injectable>(name: &'static str) -> Self {
        Self::new(
            name,
            DeclaredType::Service {
                key: ServiceKey::of::<T>(),
                descriptor: Some(TypeDescriptor::of::<T>()),
            },
        )
    }

    /// A service parameter that must come from a binding, factory or instance.
    pub fn dependency<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new(
            name,
            DeclaredType::Service {
                key: ServiceKey::of::<T>(),
                descriptor: None,
            },
        )
    }

    pub fn scalar<T: 'static>(name: &'static str) -> Self {
        Self::new(name, DeclaredType::Builtin(ServiceKey::of::<T>()))
    }

    pub fn union(name: &'static str, members: Vec<ServiceKey>) -> Self {
        Self::new(name, DeclaredType::Union(members))
    }

    pub fn intersection(name: &'static str, members: Vec<ServiceKey>) -> Self {
        Self::new(name, DeclaredType::Intersection(members))
    }

    pub fn with_default<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default = Some(Instance::of(value));
        self
    }

    pub fn with_marker<M: Marker>(mut self, marker: M) -> Self {
        self.markers.push(MarkerTag::new(marker));
        self
    }

    /// Accept an absent value when nothing else resolves.
    pub fn optional(mut self) -> Self {
        self.accepts_absent = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn markers(&self) -> &[MarkerTag] {
        &self.markers
    }

    pub fn accepts_absent(&self) -> bool {
        self.accepts_absent
    }

    /// First tag that is an instance of `marker`.
    pub fn marker(&self, marker: ServiceKey) -> Option<&MarkerTag> {
        self.markers.iter().find(|tag| tag.is_instance_of(marker))
    }

    pub fn has_marker(&self, marker: ServiceKey) -> bool {
        self.marker(marker).is_some()
    }
}

/// Resolved arguments, by parameter name.
///
/// A `None` value is an absent argument produced for an optional parameter.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: Vec<(&'static str, Option<Instance>)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &'static str, value: Option<Instance>) {
        self.entries.push((name, value));
    }

    /// Adds an argument, for constructing values without a container.
    pub fn with<T>(mut self, name: &'static str, value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.push(name, Some(Instance::new(value)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn service<T>(&self, name: &str) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.optional::<T>(name)?
            .ok_or_else(|| ContainerError::invalid_argument(name, "no value was resolved"))
    }

    pub fn optional<T>(&self, name: &str) -> ContainerResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let (_, value) = self
            .entries
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .ok_or_else(|| ContainerError::invalid_argument(name, "is not declared"))?;

        match value {
            Some(instance) => instance.downcast::<T>().map(Some).ok_or_else(|| {
                ContainerError::invalid_argument(
                    name,
                    format!("expected {}, found {}", type_name::<T>(), instance.key()),
                )
            }),
            None => Ok(None),
        }
    }

    /// Clones a plain value out of its shared handle.
    pub fn value<T>(&self, name: &str) -> ContainerResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.service::<T>(name).map(|value| T::clone(&value))
    }
}
