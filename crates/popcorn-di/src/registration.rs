//! Auto-discovery of service providers using the inventory crate
//!
//! Each crate can submit its providers with `inventory::submit!`; they are
//! discovered at runtime without the application listing them.
//!
//! ## Usage
//!
//! In a feature crate:
//!
//! ```rust,ignore
//! use popcorn_di::registration::ProviderRegistration;
//!
//! inventory::submit! {
//!     ProviderRegistration::new("mail", || Box::new(MailServiceProvider))
//! }
//! ```
//!
//! In the application:
//!
//! ```rust,ignore
//! let mut collector = ServiceCollector::new();
//! collector.collect_discovered()?;
//! ```

use crate::provider::ServiceProvider;

/// A provider submitted for discovery.
pub struct ProviderRegistration {
    /// Name of the provider group (e.g., "http", "mail")
    pub name: &'static str,

    /// Creates the provider
    pub provider: fn() -> Box<dyn ServiceProvider>,

    /// Collection order (lower = earlier, default = 100)
    pub priority: u32,
}

impl ProviderRegistration {
    /// Create a new provider registration with default priority
    pub const fn new(name: &'static str, provider: fn() -> Box<dyn ServiceProvider>) -> Self {
        Self {
            name,
            provider,
            priority: 100,
        }
    }

    /// Create a new provider registration with custom priority
    pub const fn with_priority(
        name: &'static str,
        provider: fn() -> Box<dyn ServiceProvider>,
        priority: u32,
    ) -> Self {
        Self {
            name,
            provider,
            priority,
        }
    }
}

inventory::collect!(ProviderRegistration);

/// All submitted registrations, by priority.
///
/// The sort is stable, so equal priorities keep link order.
pub fn discovered_providers() -> Vec<&'static ProviderRegistration> {
    let mut registrations: Vec<&ProviderRegistration> =
        inventory::iter::<ProviderRegistration>().collect();
    registrations.sort_by_key(|registration| registration.priority);
    registrations
}

/// Get the count of discovered provider registrations.
pub fn discovered_provider_count() -> usize {
    inventory::iter::<ProviderRegistration>().count()
}

/// List all discovered provider names, by priority.
pub fn list_discovered_providers() -> Vec<&'static str> {
    discovered_providers()
        .into_iter()
        .map(|registration| registration.name)
        .collect()
}
