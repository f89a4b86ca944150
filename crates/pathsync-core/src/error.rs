//! Error types for pathsync operations.
//!
//! Coordinator operations report resolver outcomes as [`Response`](crate::Response)
//! values. [`SyncError`] covers everything else: configuration mistakes,
//! closed subscriber channels, and callers that want to turn a response into
//! a `Result` with [`Response::into_result`](crate::Response::into_result).

/// Error type for pathsync operations.
///
/// # Example
///
/// ```rust
/// use pathsync_core::{ResourcePath, SyncError};
///
/// fn require_path(path: &str) -> Result<ResourcePath, SyncError> {
///     if path.is_empty() {
///         return Err(SyncError::Configuration("path cannot be empty".to_string()));
///     }
///     Ok(ResourcePath::new(path))
/// }
///
/// assert!(require_path("").is_err());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The resolver reported that the resource does not exist.
    #[error("resource not found: {path}")]
    NotFound {
        /// The path that was requested.
        path: String,
    },

    /// The resolver returned a non-success status other than 404.
    #[error("resolver error for {path}: status {status}")]
    Resolver {
        /// The path that was requested.
        path: String,
        /// Status code reported by the resolver.
        status: u16,
    },

    /// A verb string did not name one of the supported verbs.
    #[error("invalid verb: {verb}")]
    InvalidVerb {
        /// The rejected input.
        verb: String,
    },

    /// A client's notification sink is closed.
    #[error("client closed: client_id={client_id}")]
    ClientClosed {
        /// ID of the closed client.
        client_id: u64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unexpected internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SyncError {
    /// Create an internal error from any error type.
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error means the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
