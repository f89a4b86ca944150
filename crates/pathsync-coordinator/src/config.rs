//! Coordinator configuration.

/// How a successful mutation schedules its refresh of the mutated path.
///
/// In both modes the refresh result is never returned to the mutation's
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Run the refresh to completion before the mutation returns.
    #[default]
    Awaited,
    /// Spawn the refresh onto the Tokio runtime and return immediately.
    Detached,
}

/// Configuration for the update coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Share one resolver call between concurrent `update`s of a path.
    ///
    /// A refresh after a mutation always issues its own call.
    pub single_flight: bool,
    /// Refresh scheduling after a successful mutation.
    pub refresh_mode: RefreshMode,
    /// Maximum cached entries; `None` keeps everything (no eviction).
    pub max_entries: Option<usize>,
    /// Initial capacity of the cache map.
    pub initial_capacity: usize,
    /// Buffer size of channels created by `register_channel`.
    pub client_buffer_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            single_flight: true,
            refresh_mode: RefreshMode::Awaited,
            max_entries: None,
            initial_capacity: 64,
            client_buffer_size: 16,
        }
    }
}

impl CoordinatorConfig {
    /// Configuration that reproduces the unsynchronized behavior: no
    /// single-flight, refreshes detached.
    pub fn unsynchronized() -> Self {
        Self {
            single_flight: false,
            refresh_mode: RefreshMode::Detached,
            ..Default::default()
        }
    }
}
