//! # pathsync-core
//!
//! Core types, the resolver contract, and error handling for pathsync.
//!
//! This crate provides the foundational types used across all other pathsync crates:
//!
//! - [`ResourcePath`] - Opaque, cheaply cloned resource identifier
//! - [`ClientId`] - Opaque subscriber handle
//! - [`Response`] - Status plus optional payload returned by a resolver
//! - [`Verb`] - The CRUD verbs a resolver executes
//! - [`Resolver`] - Trait for the backing source of truth
//! - [`SyncError`] - Error type for everything that is not a resolver outcome
//!
//! ## Example
//!
//! ```rust
//! use pathsync_core::{ClientId, ResourcePath, Response};
//! use serde_json::json;
//!
//! let path = ResourcePath::new("/users/1");
//! let client = ClientId::next();
//! let response = Response::ok(json!({ "name": "Alice" }));
//!
//! assert!(!response.is_error());
//! assert_eq!(path.as_str(), "/users/1");
//! assert!(client.as_u64() > 0);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod path;
mod resolver;
mod response;
mod verb;

pub use client::ClientId;
pub use error::SyncError;
pub use path::ResourcePath;
pub use resolver::{Resolver, SharedResolver};
pub use response::Response;
pub use verb::Verb;

/// Resource value exchanged with resolvers and subscribers.
pub type Payload = serde_json::Value;

/// Result type alias using [`SyncError`].
pub type SyncResult<T> = std::result::Result<T, SyncError>;
