use crate::metadata::Scope;

/// Boxed error type used at the service boundary.
pub type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by a [`MetadataProvider`](crate::MetadataProvider).
///
/// The gate never handles these errors itself. They are returned from the service so that
/// the hosting chain decides how to present them to the client.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The metadata backend could not be reached or failed while answering.
    #[error("{scope} metadata is unavailable")]
    Unavailable {
        scope: Scope,
        #[source]
        source: StdError,
    },

    /// The metadata backend answered with something that could not be decoded.
    #[error("{scope} metadata is malformed: {message}")]
    Malformed { scope: Scope, message: String },
}

impl MetadataError {
    pub fn unavailable(scope: Scope, source: impl Into<StdError>) -> Self {
        Self::Unavailable {
            scope,
            source: source.into(),
        }
    }

    pub fn malformed(scope: Scope, message: impl Into<String>) -> Self {
        Self::Malformed {
            scope,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Unavailable { scope, .. } | Self::Malformed { scope, .. } => *scope,
        }
    }
}

/// An invalid value in a configuration mapping.
#[derive(Debug, thiserror::Error)]
#[error("invalid data locker configuration")]
pub struct ConfigError {
    #[from]
    source: serde_json::Error,
}
