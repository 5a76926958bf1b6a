//! Dependency Injection Container for Popcorn
//!
//! Services are declared on a [`ServiceCollector`], usually from
//! [`ServiceProvider`]s, frozen into a [`Registry`], and resolved from a
//! [`ServiceContainer`]. Types the container may construct on its own describe
//! their constructor by implementing [`Injectable`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use popcorn_di::{bind, injectable, ServiceCollector};
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! #[derive(Default)]
//! struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) {
//!         println!("{}", message);
//!     }
//! }
//!
//! injectable!(ConsoleLogger);
//!
//! let mut collector = ServiceCollector::new();
//! collector.autowire::<ConsoleLogger>();
//! bind!(collector, dyn Logger => ConsoleLogger);
//!
//! let container = collector.into_container().unwrap();
//! let first = container.get::<dyn Logger>().unwrap();
//! let second = container.get::<dyn Logger>().unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

pub mod callable;
pub mod collector;
pub mod container;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod key;
pub mod marker;
pub mod provider;
pub mod registration;
pub mod registry;
pub mod resolver;

pub use callable::{Function, Invocable, MethodTable, Scope};
pub use collector::ServiceCollector;
pub use container::ServiceContainer;
pub use context::ContextStack;
pub use descriptor::{Arguments, DeclaredType, Injectable, ParameterDescriptor, TypeDescriptor};
pub use error::{ContainerError, ContainerResult};
pub use factory::ServiceFactory;
pub use key::{Instance, ServiceKey};
pub use marker::{Marker, MarkerTag};
pub use provider::ServiceProvider;
pub use registration::ProviderRegistration;
pub use registry::{Registry, RegistryManifest};
pub use resolver::{
    ArgumentResolver, CallContext, ContextAwareArgumentResolver, StandardArgumentResolver,
};

/// Re-exported for `inventory::submit!` in downstream crates.
pub use inventory;

/// Implement [`Injectable`] for types built with `Default`.
#[macro_export]
macro_rules! injectable {
    ($($service:ty),+ $(,)?) => {
        $(
            impl $crate::Injectable for $service {
                fn construct(_: $crate::Arguments) -> $crate::ContainerResult<Self> {
                    Ok(<$service as ::std::default::Default>::default())
                }
            }
        )+
    };
}

/// Bind an abstract type to a concrete one through unsizing.
///
/// `bind!(collector, dyn Logger => ConsoleLogger)` registers a shared alias;
/// append `, not_shared` to mark both keys not shared.
#[macro_export]
macro_rules! bind {
    ($collector:expr, $abstract:ty => $concrete:ty, not_shared) => {
        $collector.bind_as::<$abstract, $concrete>(|concrete| concrete, false)
    };
    ($collector:expr, $abstract:ty => $concrete:ty) => {
        $collector.bind_as::<$abstract, $concrete>(|concrete| concrete, true)
    };
}

/// Build an array of [`ServiceKey`]s from types.
#[macro_export]
macro_rules! keys {
    ($($service:ty),* $(,)?) => {
        [$($crate::ServiceKey::of::<$service>()),*]
    };
}
