use std::time::Duration;

use thiserror::Error;

/// The driver-level failure wrapped inside a [`ProviderError`].
#[derive(Debug, Error)]
pub enum NativeError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    Mssql(#[from] tiberius::error::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Message(String),
}

impl NativeError {
    /// Server error number carried by the native failure, if any.
    #[must_use]
    pub fn server_code(&self) -> Option<u32> {
        match self {
            #[cfg(feature = "mssql")]
            NativeError::Mssql(tiberius::error::Error::Server(token)) => Some(token.code()),
            _ => None,
        }
    }
}

impl From<String> for NativeError {
    fn from(message: String) -> Self {
        NativeError::Message(message)
    }
}

impl From<&str> for NativeError {
    fn from(message: &str) -> Self {
        NativeError::Message(message.to_string())
    }
}

/// Every error surfaced by a provider names the component it came from.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{origin}: connection error: {source}")]
    Connectivity {
        origin: &'static str,
        source: NativeError,
    },

    #[error("{origin}: invalid argument: {message}")]
    InvalidArgument {
        origin: &'static str,
        message: String,
    },

    #[error("{origin}: native type `{type_name}` has no generic type mapping")]
    UnmappedType {
        origin: &'static str,
        type_name: String,
    },

    #[error("{origin}: parameter {name} already exists in the target collection")]
    DuplicateParameter { origin: &'static str, name: String },

    #[error("{origin}: constraint violation: {source}")]
    ConstraintViolation {
        origin: &'static str,
        source: NativeError,
    },

    #[error("{origin}: SQL execution error: {source}")]
    Execution {
        origin: &'static str,
        source: NativeError,
    },

    #[error("{origin}: configuration error: {message}")]
    Config {
        origin: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn connectivity(origin: &'static str, source: impl Into<NativeError>) -> Self {
        ProviderError::Connectivity {
            origin,
            source: source.into(),
        }
    }

    pub fn execution(origin: &'static str, source: impl Into<NativeError>) -> Self {
        ProviderError::Execution {
            origin,
            source: source.into(),
        }
    }

    pub fn invalid_argument(origin: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidArgument {
            origin,
            message: message.into(),
        }
    }

    pub fn config(origin: &'static str, message: impl Into<String>) -> Self {
        ProviderError::Config {
            origin,
            message: message.into(),
        }
    }

    /// Name of the component that raised the error.
    #[must_use]
    pub fn origin(&self) -> &'static str {
        match self {
            ProviderError::Connectivity { origin, .. }
            | ProviderError::InvalidArgument { origin, .. }
            | ProviderError::UnmappedType { origin, .. }
            | ProviderError::DuplicateParameter { origin, .. }
            | ProviderError::ConstraintViolation { origin, .. }
            | ProviderError::Execution { origin, .. }
            | ProviderError::Config { origin, .. } => origin,
        }
    }

    /// The wrapped driver failure, for variants that carry one.
    #[must_use]
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            ProviderError::Connectivity { source, .. }
            | ProviderError::ConstraintViolation { source, .. }
            | ProviderError::Execution { source, .. } => Some(source),
            _ => None,
        }
    }
}
