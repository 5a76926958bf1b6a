//! Callables whose parameters are resolved by the container
//!
//! [`Function`] describes a free function or closure for
//! [`ServiceContainer::call`](crate::ServiceContainer::call). Types expose
//! methods for [`ServiceContainer::call_method`](crate::ServiceContainer::call_method)
//! through [`Invocable`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{Arguments, ParameterDescriptor};
use crate::error::ContainerResult;

type FunctionBody<R> = Box<dyn Fn(Arguments) -> ContainerResult<R> + Send + Sync>;

/// A named function with declared parameters.
pub struct Function<R> {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    body: FunctionBody<R>,
}

impl<R> Function<R> {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Arguments) -> ContainerResult<R> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            body: Box::new(body),
        }
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn invoke(&self, arguments: Arguments) -> ContainerResult<R> {
        (self.body)(arguments)
    }
}

impl<R> fmt::Debug for Function<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Whether a method call is made on the type or on a given receiver.
pub enum Scope<T: ?Sized> {
    Type,
    Instance(Arc<T>),
}

type StaticBody = Box<dyn Fn(Arguments) -> ContainerResult<Box<dyn Any + Send>> + Send + Sync>;
type InstanceBody<T> =
    Box<dyn Fn(&T, Arguments) -> ContainerResult<Box<dyn Any + Send>> + Send + Sync>;

pub(crate) enum MethodKind<T> {
    Static(StaticBody),
    Instance(InstanceBody<T>),
}

pub(crate) struct Method<T> {
    pub(crate) parameters: Vec<ParameterDescriptor>,
    pub(crate) kind: MethodKind<T>,
}

/// Named methods of `T`.
pub struct MethodTable<T> {
    methods: HashMap<&'static str, Method<T>>,
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }
}

impl<T: 'static> MethodTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A method called without a receiver.
    pub fn with_static<R, F>(
        mut self,
        name: &'static str,
        parameters: Vec<ParameterDescriptor>,
        body: F,
    ) -> Self
    where
        R: Send + 'static,
        F: Fn(Arguments) -> ContainerResult<R> + Send + Sync + 'static,
    {
        let body: StaticBody = Box::new(
            move |arguments: Arguments| -> ContainerResult<Box<dyn Any + Send>> {
                Ok(Box::new(body(arguments)?))
            },
        );
        self.methods.insert(
            name,
            Method {
                parameters,
                kind: MethodKind::Static(body),
            },
        );
        self
    }

    /// A method called on a receiver.
    pub fn with_method<R, F>(
        mut self,
        name: &'static str,
        parameters: Vec<ParameterDescriptor>,
        body: F,
    ) -> Self
    where
        R: Send + 'static,
        F: Fn(&T, Arguments) -> ContainerResult<R> + Send + Sync + 'static,
    {
        let body: InstanceBody<T> = Box::new(
            move |receiver: &T, arguments: Arguments| -> ContainerResult<Box<dyn Any + Send>> {
                Ok(Box::new(body(receiver, arguments)?))
            },
        );
        self.methods.insert(
            name,
            Method {
                parameters,
                kind: MethodKind::Instance(body),
            },
        );
        self
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Method<T>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn is_static(&self, name: &str) -> bool {
        matches!(
            self.methods.get(name).map(|method| &method.kind),
            Some(MethodKind::Static(_))
        )
    }
}

/// A type whose methods can be called through the container.
pub trait Invocable: Send + Sync + Sized + 'static {
    fn methods() -> MethodTable<Self>;
}
