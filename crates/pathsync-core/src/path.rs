//! Resource path identifiers.
//!
//! A [`ResourcePath`] is an opaque key. Two paths are the same resource
//! exactly when their strings are equal; no structure such as segments or
//! trailing slashes is interpreted.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier for one synchronizable resource.
///
/// Backed by a shared string so cloning a path into the cache, the
/// subscription graph and every notification is a reference-count bump.
///
/// # Example
///
/// ```rust
/// use pathsync_core::ResourcePath;
///
/// let a = ResourcePath::new("/users/1");
/// let b: ResourcePath = "/users/1".into();
/// let c = ResourcePath::new("/users/1/");
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath(Arc<str>);

impl ResourcePath {
    /// Create a resource path from a string.
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    /// Get the path as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the path is the empty string.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourcePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourcePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourcePath {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&String> for ResourcePath {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

impl From<&ResourcePath> for ResourcePath {
    fn from(p: &ResourcePath) -> Self {
        p.clone()
    }
}
