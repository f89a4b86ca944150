//! Resolver contract.
//!
//! A [`Resolver`] is the source of truth behind the cache. It executes one
//! CRUD verb against one path and reports a [`Response`]. Database access,
//! routing and authentication all live behind this trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Payload, ResourcePath, Response, Verb};

/// Executor mapping `(verb, path, data)` to a [`Response`].
///
/// Implementations report failures through the response status rather than
/// panicking; the coordinator never retries a failed call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use pathsync_core::{Payload, ResourcePath, Resolver, Response, Verb};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Resolver for Echo {
///     async fn execute(
///         &self,
///         verb: Verb,
///         path: &ResourcePath,
///         _data: Option<Payload>,
///     ) -> Response {
///         Response::ok(format!("{verb} {path}").into())
///     }
/// }
/// ```
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// Execute `verb` on `path`, with `data` for mutating verbs.
    async fn execute(&self, verb: Verb, path: &ResourcePath, data: Option<Payload>) -> Response;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    async fn execute(&self, verb: Verb, path: &ResourcePath, data: Option<Payload>) -> Response {
        (**self).execute(verb, path, data).await
    }
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Box<R> {
    async fn execute(&self, verb: Verb, path: &ResourcePath, data: Option<Payload>) -> Response {
        (**self).execute(verb, path, data).await
    }
}

/// Shared, type-erased resolver.
pub type SharedResolver = Arc<dyn Resolver>;
