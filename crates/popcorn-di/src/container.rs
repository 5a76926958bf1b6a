//! The service container
//!
//! Resolution order for a key:
//!
//! 1. an alias is followed to its target, and failures are reported against
//!    the alias;
//! 2. a key the container cannot produce fails with `ServiceNotFound`;
//! 3. a cached shared instance is returned;
//! 4. a registered factory is invoked;
//! 5. a key excluded from autowiring fails with `ServiceNotFound`;
//! 6. the key is autowired from its type descriptor;
//! 7. shared results are cached.
//!
//! The container is safe to share between threads. No lock is held while a
//! factory or constructor runs, and the resolution stack used for cycle
//! detection is kept per thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::callable::{Function, Invocable, MethodKind, Scope};
use crate::descriptor::{Arguments, Injectable, ParameterDescriptor, TypeDescriptor};
use crate::error::{ContainerError, ContainerResult};
use crate::key::{Instance, ServiceKey};
use crate::registry::{Binding, Registry};
use crate::resolver::{ArgumentResolver, CallContext, ContextGuard, StandardArgumentResolver};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static RESOLVING: RefCell<Vec<(u64, ServiceKey)>> = const { RefCell::new(Vec::new()) };
}

/// Entry on the current thread's resolution stack, popped on drop.
struct ResolutionGuard {
    container: u64,
    key: ServiceKey,
}

impl ResolutionGuard {
    fn enter(container: u64, key: ServiceKey) -> ContainerResult<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            let active = stack
                .iter()
                .filter(|(owner, _)| *owner == container)
                .map(|(_, key)| *key);

            if let Some(start) = active.clone().position(|active| active == key) {
                let mut chain: Vec<ServiceKey> = active.skip(start).collect();
                chain.push(key);
                return Err(ContainerError::CircularDependency {
                    service: key,
                    chain,
                });
            }

            stack.push((container, key));
            Ok(Self { container, key })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        let _ = RESOLVING.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack
                .iter()
                .rposition(|(owner, key)| *owner == self.container && *key == self.key)
            {
                stack.remove(position);
            }
        });
    }
}

/// Resolves services from a frozen [`Registry`].
pub struct ServiceContainer {
    id: u64,
    registry: Registry,
    default_resolver: Arc<dyn ArgumentResolver>,
    descriptors: RwLock<HashMap<ServiceKey, TypeDescriptor>>,
    instances: RwLock<HashMap<ServiceKey, Instance>>,
}

impl ServiceContainer {
    pub fn new(registry: Registry) -> Self {
        Self::with_default_resolver(registry, Arc::new(StandardArgumentResolver::new()))
    }

    /// Create a container whose unmarked parameters are resolved by `resolver`.
    pub fn with_default_resolver(registry: Registry, resolver: Arc<dyn ArgumentResolver>) -> Self {
        let descriptors = registry.descriptors.clone();
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            registry,
            default_resolver: resolver,
            descriptors: RwLock::new(descriptors),
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn has<T: ?Sized + 'static>(&self) -> bool {
        self.has_key(ServiceKey::of::<T>())
    }

    /// Whether the container could attempt to resolve `key`.
    ///
    /// `true` does not guarantee that [`get_key`](Self::get_key) succeeds.
    pub fn has_key(&self, key: ServiceKey) -> bool {
        let mut current = key;
        // A frozen registry has no alias loops; the bound guards hand-built ones.
        for _ in 0..=self.registry.bindings.len() {
            if self.resolvable_without_alias(current) {
                return true;
            }
            match self.registry.alias_target(current) {
                Some(target) => current = target,
                None => return false,
            }
        }
        false
    }

    fn resolvable_without_alias(&self, key: ServiceKey) -> bool {
        self.instances.read().contains_key(&key)
            || self.registry.has_factory(key)
            || (self.registry.is_autowired(key)
                && self
                    .descriptors
                    .read()
                    .get(&key)
                    .is_some_and(|descriptor| descriptor.is_constructible()))
    }

    pub fn is_shared<T: ?Sized + 'static>(&self) -> bool {
        self.registry.is_shared(ServiceKey::of::<T>())
    }

    pub fn is_alias<T: ?Sized + 'static>(&self) -> bool {
        self.registry.alias_target(ServiceKey::of::<T>()).is_some()
    }

    /// Whether an instance of `T` is cached right now.
    pub fn resolved<T: ?Sized + 'static>(&self) -> bool {
        self.resolved_key(ServiceKey::of::<T>())
    }

    pub fn resolved_key(&self, key: ServiceKey) -> bool {
        self.instances.read().contains_key(&key)
    }

    /// Teach the container how to construct a type.
    ///
    /// A constructible descriptor replaces an abstract one, never the reverse.
    pub fn register_descriptor(&self, descriptor: TypeDescriptor) {
        let mut descriptors = self.descriptors.write();
        let known = descriptors.entry(descriptor.key()).or_insert(descriptor);
        if descriptor.is_constructible() && !known.is_constructible() {
            *known = descriptor;
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    pub fn get<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_key(ServiceKey::of::<T>())?.downcast_checked::<T>()
    }

    /// Resolve an autowirable type without declaring it first.
    pub fn make<T: Injectable>(&self) -> ContainerResult<Arc<T>> {
        self.register_descriptor(TypeDescriptor::of::<T>());
        self.get::<T>()
    }

    pub fn get_key(&self, key: ServiceKey) -> ContainerResult<Instance> {
        if let Some(binding) = self.registry.bindings.get(&key) {
            return self
                .resolve_alias(key, binding)
                .map_err(|error| ContainerError::unresolvable(key, Some(error)));
        }

        if !self.has_key(key) {
            return Err(self.missing(key));
        }

        if let Some(instance) = self.instances.read().get(&key) {
            trace!("Resolved cached instance of {}", key);
            return Ok(instance.clone());
        }

        let _guard = ResolutionGuard::enter(self.id, key)?;

        let instance = if let Some(factory) = self.registry.factories.get(&key) {
            debug!("Resolving {} through its factory", key);
            factory(self)?.ok_or_else(|| ContainerError::unresolvable(key, None))?
        } else if !self.registry.is_autowired(key) {
            return Err(ContainerError::not_found(key));
        } else {
            self.autowire(key)?
        };

        if instance.key() != key {
            return Err(ContainerError::TypeMismatch {
                expected: key,
                actual: instance.key(),
            });
        }

        if self.registry.is_shared(key) {
            Ok(self.store(key, instance))
        } else {
            Ok(instance)
        }
    }

    fn missing(&self, key: ServiceKey) -> ContainerError {
        let declared_abstract = self.registry.is_autowired(key)
            && self
                .descriptors
                .read()
                .get(&key)
                .is_some_and(|descriptor| !descriptor.is_constructible());

        if declared_abstract {
            ContainerError::NotInstantiable { service: key }
        } else {
            ContainerError::not_found(key)
        }
    }

    fn resolve_alias(&self, key: ServiceKey, binding: &Binding) -> ContainerResult<Instance> {
        let _guard = ResolutionGuard::enter(self.id, key)?;
        trace!("Following alias {} -> {}", key, binding.target);
        let target = self.get_key(binding.target)?;
        (binding.upcast)(target)
    }

    fn autowire(&self, key: ServiceKey) -> ContainerResult<Instance> {
        let descriptor = self
            .descriptors
            .read()
            .get(&key)
            .copied()
            .ok_or_else(|| ContainerError::not_found(key))?;

        if !descriptor.is_constructible() {
            return Err(ContainerError::NotInstantiable { service: key });
        }

        debug!("Autowiring {}", key);
        let parameters = descriptor.parameters();
        let arguments = if parameters.is_empty() {
            Arguments::new()
        } else {
            self.collect_arguments(&parameters, &CallContext::constructor(key))?
        };

        descriptor
            .construct(arguments)
            .map_err(|error| ContainerError::unresolvable(key, Some(error)))
    }

    /// Cache a shared instance. If another thread got there first, its
    /// instance wins so every caller sees the same one.
    fn store(&self, key: ServiceKey, instance: Instance) -> Instance {
        self.instances.write().entry(key).or_insert(instance).clone()
    }

    fn collect_arguments(
        &self,
        parameters: &[ParameterDescriptor],
        context: &CallContext,
    ) -> ContainerResult<Arguments> {
        let mut arguments = Arguments::with_capacity(parameters.len());
        for parameter in parameters {
            let value = self.resolve_parameter(parameter, context)?;
            arguments.push(parameter.name(), value);
        }
        Ok(arguments)
    }

    fn resolve_parameter(
        &self,
        parameter: &ParameterDescriptor,
        context: &CallContext,
    ) -> ContainerResult<Option<Instance>> {
        let resolver = self
            .registry
            .resolvers
            .iter()
            .find(|(marker, _)| parameter.has_marker(*marker))
            .map(|(_, resolver)| resolver)
            .unwrap_or(&self.default_resolver);

        let _context = ContextGuard::enter(resolver.as_ref(), context);
        resolver.resolve(parameter, self)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Resolve a function's parameters and call it.
    pub fn call<R>(&self, function: &Function<R>) -> ContainerResult<R> {
        let context = CallContext::new(function.name(), None);
        let arguments = self.collect_arguments(function.parameters(), &context)?;

        function.invoke(arguments).map_err(|error| {
            if error.is_invocation_failure() {
                ContainerError::UncallableFunction {
                    function: function.name().to_string(),
                    source: Some(Box::new(error)),
                }
            } else {
                error
            }
        })
    }

    /// Resolve a method's parameters and call it.
    ///
    /// Instance methods called on [`Scope::Type`] resolve their receiver with
    /// [`get`](Self::get) first.
    pub fn call_method<T, R>(&self, scope: Scope<T>, method: &str) -> ContainerResult<R>
    where
        T: Invocable,
        R: 'static,
    {
        let service = ServiceKey::of::<T>();
        let uncallable = |source: Option<ContainerError>| ContainerError::UncallableMethod {
            service,
            method: method.to_string(),
            source: source.map(Box::new),
        };

        let methods = T::methods();
        let entry = methods.get(method).ok_or_else(|| uncallable(None))?;
        let context = CallContext::new(method, Some(service));

        let output = match &entry.kind {
            MethodKind::Static(body) => {
                let arguments = self.collect_arguments(&entry.parameters, &context)?;
                body(arguments)
            }
            MethodKind::Instance(body) => {
                let receiver = match scope {
                    Scope::Instance(receiver) => receiver,
                    Scope::Type => self.get::<T>()?,
                };
                let arguments = self.collect_arguments(&entry.parameters, &context)?;
                body(&*receiver, arguments)
            }
        }
        .map_err(|error| {
            if error.is_invocation_failure() {
                uncallable(Some(error))
            } else {
                error
            }
        })?;

        output
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| {
                uncallable(Some(ContainerError::invalid_argument(
                    "return",
                    format!("method does not return {}", std::any::type_name::<R>()),
                )))
            })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Put a pre-built instance into the container under `T`.
    pub fn instance<T>(&self, value: Arc<T>, overwrite: bool) -> ContainerResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.put(Instance::new(value), overwrite)
    }

    /// Put a type-erased instance into the container under its own key.
    pub fn put(&self, instance: Instance, overwrite: bool) -> ContainerResult<&Self> {
        let key = instance.key();
        let mut instances = self.instances.write();

        if instances.contains_key(&key) && !overwrite {
            return Err(ContainerError::InstanceAlreadySet { service: key });
        }

        instances.insert(key, instance);
        debug!("Set instance of {}", key);
        Ok(self)
    }

    /// Drop cached instances of scoped keys. Everything else stays cached.
    pub fn flush_scope(&self) -> &Self {
        let mut instances = self.instances.write();
        for key in &self.registry.scoped {
            if instances.remove(key).is_some() {
                trace!("Flushed scoped instance of {}", key);
            }
        }
        self
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .field("instances", &self.instances.read().len())
            .finish()
    }
}
