//! Runtimes
//!
//! A runtime is the outermost driver of an application, such as the HTTP
//! runtime. It is booted once after the bootstrappers ran, then run.

use std::any::Any;

use popcorn_di::ServiceContainer;

use crate::error::CoreResult;

/// Drives the application once it is bootstrapped.
///
/// The active runtime is available from the container as `dyn Runtime`.
/// Use [`as_any`](Runtime::as_any) to reach the concrete runtime.
pub trait Runtime: Send + Sync + 'static {
    /// Returns the name of this runtime, for logging and errors.
    fn name(&self) -> &'static str;

    fn boot(&self, _container: &ServiceContainer) -> CoreResult<()> {
        Ok(())
    }

    fn run(&self, container: &ServiceContainer) -> CoreResult<()>;

    fn as_any(&self) -> &dyn Any;
}
