//! Resolver outcomes.

use crate::{Payload, SyncError, SyncResult};

/// Immutable outcome of a resolver operation.
///
/// A response is a status code plus an optional payload. Any status outside
/// `200..=299` is an error; `404` is the distinguished "resource does not
/// exist" case that drives cache eviction.
///
/// # Example
///
/// ```rust
/// use pathsync_core::Response;
/// use serde_json::json;
///
/// let ok = Response::ok(json!({ "name": "Alice" }));
/// assert!(!ok.is_error());
///
/// let gone = Response::not_found();
/// assert!(gone.is_error());
/// assert!(gone.is_not_found());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    payload: Option<Payload>,
}

impl Response {
    /// Status for a successful read or replace.
    pub const OK: u16 = 200;
    /// Status for a successful create.
    pub const CREATED: u16 = 201;
    /// Status for a success without a body.
    pub const NO_CONTENT: u16 = 204;
    /// Status for a malformed request.
    pub const BAD_REQUEST: u16 = 400;
    /// Status for a missing resource.
    pub const NOT_FOUND: u16 = 404;
    /// Status for an unexpected resolver failure.
    pub const INTERNAL_ERROR: u16 = 500;
    /// Status for a resolver that cannot serve right now.
    pub const UNAVAILABLE: u16 = 503;

    /// Create a response from a status and optional payload.
    #[must_use]
    pub fn new(status: u16, payload: Option<Payload>) -> Self {
        Self { status, payload }
    }

    /// A `200 OK` response carrying `payload`.
    #[must_use]
    pub fn ok(payload: Payload) -> Self {
        Self::new(Self::OK, Some(payload))
    }

    /// A `201 Created` response carrying `payload`.
    #[must_use]
    pub fn created(payload: Payload) -> Self {
        Self::new(Self::CREATED, Some(payload))
    }

    /// A `204 No Content` response.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(Self::NO_CONTENT, None)
    }

    /// A `404 Not Found` response.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(Self::NOT_FOUND, None)
    }

    /// An error response with the given status and no payload.
    #[must_use]
    pub fn error(status: u16) -> Self {
        Self::new(status, None)
    }

    /// Status code reported by the resolver.
    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Payload, if the resolver returned one.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Consume the response and return its payload.
    #[must_use]
    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }

    /// Whether the status lies outside the success range.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        !(200..=299).contains(&self.status)
    }

    /// Whether the status signals that the resource does not exist.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Self::NOT_FOUND
    }

    /// Convert into a `Result`, attributing errors to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] for `404` and [`SyncError::Resolver`]
    /// for every other error status.
    pub fn into_result(self, path: &str) -> SyncResult<Option<Payload>> {
        if self.is_not_found() {
            Err(SyncError::NotFound {
                path: path.to_string(),
            })
        } else if self.is_error() {
            Err(SyncError::Resolver {
                path: path.to_string(),
                status: self.status,
            })
        } else {
            Ok(self.payload)
        }
    }
}
