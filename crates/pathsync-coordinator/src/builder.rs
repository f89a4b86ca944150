//! Builder for configuring and creating an update coordinator.

use std::sync::Arc;

use pathsync_cache::{EvictionPolicy, ResourceCache};
use pathsync_core::{Resolver, SharedResolver, SyncError, SyncResult};

use crate::config::{CoordinatorConfig, RefreshMode};
use crate::UpdateCoordinator;

/// Builder for creating an [`UpdateCoordinator`].
///
/// # Example
///
/// ```rust,ignore
/// use pathsync_coordinator::{MemoryResolver, RefreshMode, UpdateCoordinator};
///
/// let coordinator = UpdateCoordinator::builder()
///     .resolver(MemoryResolver::new())
///     .refresh_mode(RefreshMode::Detached)
///     .max_entries(10_000)
///     .build()?;
/// ```
#[derive(Default)]
pub struct UpdateCoordinatorBuilder {
    resolver: Option<SharedResolver>,
    config: CoordinatorConfig,
    policy: Option<Box<dyn EvictionPolicy>>,
}

impl std::fmt::Debug for UpdateCoordinatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinatorBuilder")
            .field("resolver", &self.resolver.is_some())
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish()
    }
}

impl UpdateCoordinatorBuilder {
    /// Create a new coordinator builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resolver.
    ///
    /// This is required.
    pub fn resolver(mut self, resolver: impl Resolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Set an already shared resolver.
    pub fn shared_resolver(mut self, resolver: SharedResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable single-flight fetches (enabled by default).
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.config.single_flight = enabled;
        self
    }

    /// Set how mutations schedule their refresh.
    pub fn refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.config.refresh_mode = mode;
        self
    }

    /// Bound the cache to `max` entries with LRU eviction.
    pub fn max_entries(mut self, max: usize) -> Self {
        self.config.max_entries = Some(max);
        self
    }

    /// Use a custom eviction policy. Takes precedence over `max_entries`.
    pub fn eviction_policy(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Set the initial capacity of the cache map.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Set the buffer size of channel-backed clients.
    pub fn client_buffer_size(mut self, size: usize) -> Self {
        self.config.client_buffer_size = size;
        self
    }

    /// Build the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No resolver was provided
    /// - `max_entries` is zero
    /// - `client_buffer_size` is zero
    pub fn build(self) -> SyncResult<UpdateCoordinator> {
        let resolver = self
            .resolver
            .ok_or_else(|| SyncError::Configuration("resolver is required".into()))?;

        if self.config.max_entries == Some(0) {
            return Err(SyncError::Configuration(
                "max_entries must be greater than zero".into(),
            ));
        }
        if self.config.client_buffer_size == 0 {
            return Err(SyncError::Configuration(
                "client_buffer_size must be greater than zero".into(),
            ));
        }

        let cache = self
            .policy
            .map(|policy| ResourceCache::with_policy(self.config.initial_capacity, policy));

        Ok(UpdateCoordinator::from_parts(resolver, self.config, cache))
    }
}
