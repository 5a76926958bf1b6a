//! HTTP layer for Popcorn
//!
//! Provides the [`HttpRuntime`], the [`Request`] service and the
//! [`FromContext`] parameter marker.

pub mod context;
pub mod error;
pub mod provider;
pub mod request;
pub mod runtime;

pub use context::{ContextResolver, FromContext};
pub use error::{HttpError, HttpResult};
pub use provider::{HttpServiceProvider, RequestServiceFactory};
pub use request::{Request, RequestBuilder, RequestMethod};
pub use runtime::{HttpRuntime, RequestHandler};
