//! Error types for service collection and resolution

use crate::key::ServiceKey;

/// Errors that can occur while collecting, resolving or invoking services
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Service \"{service}\" not found.")]
    ServiceNotFound { service: ServiceKey },

    #[error("The service \"{service}\" cannot be resolved.")]
    Unresolvable {
        service: ServiceKey,
        source: Option<Box<ContainerError>>,
    },

    #[error("The service \"{service}\" cannot be instantiated.")]
    NotInstantiable { service: ServiceKey },

    #[error(
        "Unable to resolve parameter \"{parameter}\" on \"{}\"",
        qualified(.service, .function)
    )]
    UnresolvableParameter {
        parameter: String,
        function: String,
        service: Option<ServiceKey>,
        source: Option<Box<ContainerError>>,
    },

    #[error("Circular dependency detected for service \"{service}\": {}", chain_of(.chain))]
    CircularDependency {
        service: ServiceKey,
        chain: Vec<ServiceKey>,
    },

    #[error("Circular alias detected: {}", chain_of(.chain))]
    CircularAlias { chain: Vec<ServiceKey> },

    #[error("The service \"{service}\" is already set.")]
    InstanceAlreadySet { service: ServiceKey },

    #[error("Unable to successfully call the provided callable \"{function}\".")]
    UncallableFunction {
        function: String,
        source: Option<Box<ContainerError>>,
    },

    #[error("Unable to successfully call \"{method}\" on \"{service}\".")]
    UncallableMethod {
        service: ServiceKey,
        method: String,
        source: Option<Box<ContainerError>>,
    },

    #[error("Invalid argument \"{name}\": {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Service \"{expected}\" resolved to an incompatible instance of \"{actual}\"")]
    TypeMismatch {
        expected: ServiceKey,
        actual: ServiceKey,
    },

    #[error("Factory for \"{service}\" failed: {message}")]
    Factory { service: ServiceKey, message: String },

    #[error("The context is not set for \"{context}\"")]
    ContextNotSet { context: ServiceKey },

    #[error("Context already set for \"{context}\"")]
    ContextAlreadySet { context: ServiceKey },
}

pub type ContainerResult<T> = Result<T, ContainerError>;

impl ContainerError {
    pub fn not_found(service: ServiceKey) -> Self {
        Self::ServiceNotFound { service }
    }

    pub fn unresolvable(service: ServiceKey, source: Option<ContainerError>) -> Self {
        Self::Unresolvable {
            service,
            source: source.map(Box::new),
        }
    }

    /// Explicit failure raised from inside a service factory.
    pub fn factory(service: ServiceKey, message: impl Into<String>) -> Self {
        Self::Factory {
            service,
            message: message.into(),
        }
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The service key the error is reported against, if it has one.
    pub fn service(&self) -> Option<ServiceKey> {
        match self {
            Self::ServiceNotFound { service }
            | Self::Unresolvable { service, .. }
            | Self::NotInstantiable { service }
            | Self::CircularDependency { service, .. }
            | Self::InstanceAlreadySet { service }
            | Self::UncallableMethod { service, .. }
            | Self::Factory { service, .. } => Some(*service),
            Self::UnresolvableParameter { service, .. } => *service,
            Self::TypeMismatch { expected, .. } => Some(*expected),
            _ => None,
        }
    }

    /// Direct cause of this error within the container taxonomy.
    pub fn cause(&self) -> Option<&ContainerError> {
        match self {
            Self::Unresolvable { source, .. }
            | Self::UnresolvableParameter { source, .. }
            | Self::UncallableFunction { source, .. }
            | Self::UncallableMethod { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    /// Walks the cause chain, starting with `self`.
    pub fn chain(&self) -> impl Iterator<Item = &ContainerError> {
        std::iter::successors(Some(self), |error| error.cause())
    }

    /// The innermost error of the cause chain.
    pub fn root_cause(&self) -> &ContainerError {
        self.chain().last().unwrap_or(self)
    }

    pub fn is_circular(&self) -> bool {
        self.chain().any(|error| {
            matches!(
                error,
                Self::CircularDependency { .. } | Self::CircularAlias { .. }
            )
        })
    }

    /// Failures of the argument glue between the container and a callable,
    /// as opposed to failures of the callable itself.
    pub(crate) fn is_invocation_failure(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::TypeMismatch { .. })
    }
}

fn qualified(service: &Option<ServiceKey>, function: &str) -> String {
    match service {
        Some(service) => format!("{}::{}", service, function),
        None => function.to_string(),
    }
}

fn chain_of(chain: &[ServiceKey]) -> String {
    chain
        .iter()
        .map(|key| key.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}
