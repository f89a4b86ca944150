//! CRUD verbs understood by resolvers.

use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// Operation requested from a [`Resolver`](crate::Resolver).
///
/// Verbs display and parse as their lowercase names.
///
/// # Example
///
/// ```rust
/// use pathsync_core::Verb;
///
/// let verb: Verb = "patch".parse().unwrap();
/// assert_eq!(verb, Verb::Patch);
/// assert!(verb.is_mutation());
/// assert_eq!(Verb::Get.to_string(), "get");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Fetch the current value.
    Get,
    /// Create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Partially update a resource.
    Patch,
    /// Remove a resource.
    Delete,
}

impl Verb {
    /// All verbs, in declaration order.
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

    /// Lowercase name of the verb.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }

    /// Whether this verb changes resolver state.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Verb::Get)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SyncError::InvalidVerb {
                verb: s.to_string(),
            })
    }
}
