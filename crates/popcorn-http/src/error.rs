//! HTTP error types

use popcorn_di::ContainerError;
use thiserror::Error;

/// HTTP result type
pub type HttpResult<T> = Result<T, HttpError>;

/// HTTP errors
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    #[error("Request method is not set")]
    MissingMethod,

    #[error("Request is not set")]
    NoRequest,

    #[error("A request is already being handled")]
    RequestInFlight,

    #[error("No request handler was configured")]
    NoHandler,

    #[error(transparent)]
    Container(#[from] ContainerError),
}
