//! Service Provider trait for dependency injection
//!
//! A service provider groups the declarations of one module of an
//! application. Providers are collected into a
//! [`ServiceCollector`](crate::ServiceCollector), once per provider type.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use popcorn_di::{bind, ContainerResult, ServiceCollector, ServiceProvider};
//!
//! pub struct MailServiceProvider;
//!
//! impl ServiceProvider for MailServiceProvider {
//!     fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()> {
//!         collector.collect(&TransportServiceProvider)?;
//!         bind!(collector, dyn Mailer => SmtpMailer);
//!         collector.autowire::<SmtpMailer>();
//!         Ok(())
//!     }
//! }
//! ```
//!
//! ## Auto-Discovery
//!
//! Providers can also be submitted with `inventory` and picked up by
//! [`ServiceCollector::collect_discovered`](crate::ServiceCollector::collect_discovered).
//! See [`registration`](crate::registration).

use std::any::{type_name, TypeId};

use crate::collector::ServiceCollector;
use crate::error::ContainerResult;

// ============================================================================
// ServiceProvider Trait
// ============================================================================

/// Trait for types that declare services.
pub trait ServiceProvider: Send + Sync + 'static {
    /// Declare bindings, factories and markers on the collector.
    ///
    /// Called at most once per provider type and collector.
    fn register(&self, collector: &mut ServiceCollector) -> ContainerResult<()>;

    /// Returns the name of this service provider, for logging.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Identity used to collect each provider type only once.
    fn provider_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}
