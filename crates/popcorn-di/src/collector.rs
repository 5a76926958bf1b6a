//! Service collection
//!
//! [`ServiceCollector`] accumulates the declarations made by service providers
//! and freezes them into a [`Registry`].

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::container::ServiceContainer;
use crate::descriptor::{Injectable, TypeDescriptor};
use crate::error::ContainerResult;
use crate::factory::{self, ServiceFactory};
use crate::key::{Instance, ServiceKey};
use crate::marker::Marker;
use crate::provider::ServiceProvider;
use crate::registration;
use crate::registry::{Binding, Registry};
use crate::resolver::ArgumentResolver;

/// Builder side of the container.
#[derive(Debug, Default)]
pub struct ServiceCollector {
    registry: Registry,
    collected: HashSet<TypeId>,
}

impl ServiceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias `A` to `C`. The upcast turns the concrete handle into the
    /// abstract one, usually `|concrete| concrete`.
    ///
    /// When `shared` is false both keys are marked not shared.
    pub fn bind_as<A, C>(&mut self, upcast: fn(Arc<C>) -> Arc<A>, shared: bool) -> &mut Self
    where
        A: ?Sized + Send + Sync + 'static,
        C: ?Sized + Send + Sync + 'static,
    {
        let target = ServiceKey::of::<C>();
        let abstract_key = ServiceKey::of::<A>();

        let binding = Binding {
            target,
            upcast: Arc::new(move |instance: Instance| -> ContainerResult<Instance> {
                Ok(Instance::new(upcast(instance.downcast_checked::<C>()?)))
            }),
        };

        if self.registry.bindings.insert(abstract_key, binding).is_some() {
            warn!("Replaced existing binding for {}", abstract_key);
        }

        if !shared {
            self.not_shared([abstract_key, target]);
        }

        debug!("Bound {} to {}", abstract_key, target);
        self
    }

    /// Alias `A` to the autowirable type `C`.
    pub fn bind<A, C>(&mut self, upcast: fn(Arc<C>) -> Arc<A>, shared: bool) -> &mut Self
    where
        A: ?Sized + Send + Sync + 'static,
        C: Injectable,
    {
        self.autowire::<C>();
        self.bind_as(upcast, shared)
    }

    /// Register a closure factory for `T`.
    pub fn factory<T, F>(&mut self, factory: F, shared: bool) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceContainer) -> ContainerResult<Option<Arc<T>>> + Send + Sync + 'static,
    {
        self.insert_factory(ServiceKey::of::<T>(), factory::erase_fn(factory), shared)
    }

    /// Register a [`ServiceFactory`] implementation for `T`.
    pub fn factory_from<T, F>(&mut self, factory: F, shared: bool) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: ServiceFactory<T> + 'static,
    {
        self.insert_factory(ServiceKey::of::<T>(), factory::erase(factory), shared)
    }

    fn insert_factory(
        &mut self,
        key: ServiceKey,
        factory: factory::ErasedFactory,
        shared: bool,
    ) -> &mut Self {
        if self.registry.factories.insert(key, factory).is_some() {
            warn!("Replaced existing factory for {}", key);
        }

        if !shared {
            self.not_shared([key]);
        }

        debug!("Registered factory for {}", key);
        self
    }

    pub fn not_shared(&mut self, keys: impl IntoIterator<Item = ServiceKey>) -> &mut Self {
        self.registry.not_shared.extend(keys);
        self
    }

    pub fn not_autowired(&mut self, keys: impl IntoIterator<Item = ServiceKey>) -> &mut Self {
        self.registry.not_autowired.extend(keys);
        self
    }

    /// Mark keys whose cached instances are dropped by
    /// [`ServiceContainer::flush_scope`].
    pub fn scoped(&mut self, keys: impl IntoIterator<Item = ServiceKey>) -> &mut Self {
        self.registry.scoped.extend(keys);
        self
    }

    /// Resolve parameters marked with `M` through `resolver`.
    ///
    /// Registering the same marker again replaces its resolver but keeps its
    /// place in the selection order.
    pub fn resolver<M, R>(&mut self, resolver: Arc<R>) -> &mut Self
    where
        M: Marker,
        R: ArgumentResolver + 'static,
    {
        let marker = ServiceKey::of::<M>();
        let resolver: Arc<dyn ArgumentResolver> = resolver;

        match self
            .registry
            .resolvers
            .iter_mut()
            .find(|(existing, _)| *existing == marker)
        {
            Some(entry) => entry.1 = resolver,
            None => self.registry.resolvers.push((marker, resolver)),
        }

        debug!("Registered resolver for marker {}", marker);
        self
    }

    /// Make `T` known to the container before anything asks for it.
    pub fn autowire<T: Injectable>(&mut self) -> &mut Self {
        self.descriptor(TypeDescriptor::of::<T>())
    }

    /// Declare `T` as a known type that cannot be constructed directly.
    pub fn declare_abstract<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.descriptor(TypeDescriptor::abstract_of::<T>())
    }

    fn descriptor(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        let known = self.registry.descriptors.entry(descriptor.key()).or_insert(descriptor);
        if descriptor.is_constructible() {
            *known = descriptor;
        }
        self
    }

    /// Run a provider's registration, once per provider type.
    pub fn collect(&mut self, provider: &dyn ServiceProvider) -> ContainerResult<&mut Self> {
        if !self.collected.insert(provider.provider_id()) {
            debug!("Provider '{}' already collected", provider.name());
            return Ok(self);
        }

        debug!("Collecting provider '{}'", provider.name());
        if let Err(error) = provider.register(self) {
            // Declarations made before the failure stay; a retry may add the rest.
            self.collected.remove(&provider.provider_id());
            return Err(error);
        }
        Ok(self)
    }

    /// Collect every provider submitted through `inventory`.
    pub fn collect_discovered(&mut self) -> ContainerResult<&mut Self> {
        let registrations = registration::discovered_providers();
        info!("Discovered {} service providers via inventory", registrations.len());

        for registration in registrations {
            debug!(
                "Collecting discovered provider '{}' (priority: {})",
                registration.name, registration.priority
            );
            let provider = (registration.provider)();
            self.collect(provider.as_ref())?;
        }

        Ok(self)
    }

    pub fn has_collected<P: ServiceProvider>(&self) -> bool {
        self.collected.contains(&TypeId::of::<P>())
    }

    /// Declarations made so far.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Freeze the declarations.
    pub fn into_registry(mut self) -> ContainerResult<Registry> {
        self.registry.check_aliases()?;
        self.registry.propagate_scope();
        info!(
            "Collected {} providers into a registry with {} bindings and {} factories",
            self.collected.len(),
            self.registry.bindings.len(),
            self.registry.factories.len()
        );
        Ok(self.registry)
    }

    pub fn into_container(self) -> ContainerResult<ServiceContainer> {
        Ok(ServiceContainer::new(self.into_registry()?))
    }
}
