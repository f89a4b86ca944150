//! Client registry and notification sinks.
//!
//! A client is a [`ClientId`] plus the [`NotificationSink`] registered for
//! it. The registry only stores sinks; which paths a client follows lives in
//! the subscription graph.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use pathsync_core::{ClientId, Payload, ResourcePath, SyncError, SyncResult};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// One value pushed to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Path whose state changed.
    pub path: ResourcePath,
    /// New value, or `None` when the resource was removed.
    pub value: Option<Arc<Payload>>,
}

impl Notification {
    /// Whether this notification reports that the resource is gone.
    #[inline]
    pub fn is_eviction(&self) -> bool {
        self.value.is_none()
    }
}

/// Destination for a client's notifications.
///
/// `notify` runs synchronously during fan-out with no coordinator lock held.
/// Implementations should hand the value off quickly (push to a channel,
/// write to a socket buffer) rather than block.
///
/// Any `Fn(&ResourcePath, Option<Arc<Payload>>)` closure is a sink.
pub trait NotificationSink: Send + Sync {
    /// Deliver `value` for `path`; `None` means the resource was removed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ClientClosed`] when the client can no longer
    /// receive anything. The coordinator then deregisters the client.
    fn notify(&self, path: &ResourcePath, value: Option<Arc<Payload>>) -> SyncResult<()>;
}

impl<F> NotificationSink for F
where
    F: Fn(&ResourcePath, Option<Arc<Payload>>) + Send + Sync,
{
    fn notify(&self, path: &ResourcePath, value: Option<Arc<Payload>>) -> SyncResult<()> {
        self(path, value);
        Ok(())
    }
}

/// Sink backed by a bounded Tokio channel.
///
/// When the channel is full the notification is dropped; the client will
/// see the next one. When the receiving [`Subscriber`] is gone the sink
/// reports the client as closed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    id: ClientId,
    sender: mpsc::Sender<Notification>,
}

impl ChannelSink {
    /// Create a sink/subscriber pair for `id`.
    ///
    /// `buffer` must be greater than zero.
    pub fn pair(id: ClientId, buffer: usize) -> (ChannelSink, Subscriber) {
        let (sender, receiver) = mpsc::channel(buffer);
        (ChannelSink { id, sender }, Subscriber { id, receiver })
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, path: &ResourcePath, value: Option<Arc<Payload>>) -> SyncResult<()> {
        let notification = Notification {
            path: path.clone(),
            value,
        };
        match self.sender.try_send(notification) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    client = %self.id,
                    path = %dropped.path,
                    "subscriber channel full, dropping notification"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SyncError::ClientClosed {
                client_id: self.id.as_u64(),
            }),
        }
    }
}

/// Receiving end of a channel-backed client.
///
/// Dropping the subscriber closes the channel; the coordinator deregisters
/// the client the next time it tries to notify it.
#[derive(Debug)]
pub struct Subscriber {
    id: ClientId,
    receiver: mpsc::Receiver<Notification>,
}

impl Subscriber {
    /// The client this subscriber receives for.
    #[inline]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Receive the next notification.
    ///
    /// Returns `None` once the client has been deregistered and every
    /// buffered notification has been received.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }

    /// Try to receive a notification without waiting.
    pub fn try_recv(&mut self) -> Result<Notification, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Result of delivering one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The sink accepted the notification.
    Delivered,
    /// No sink is registered for the client.
    NoSink,
    /// The sink reported the client closed.
    Closed,
    /// The sink failed for another reason; the client stays registered.
    Failed,
}

/// Registered notification sinks keyed by client.
#[derive(Default)]
pub struct ClientRegistry {
    sinks: DashMap<ClientId, Arc<dyn NotificationSink>>,
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.sinks.len())
            .finish()
    }
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` for `client`, replacing any previous sink.
    pub fn insert(&self, client: ClientId, sink: Arc<dyn NotificationSink>) {
        self.sinks.insert(client, sink);
    }

    /// Remove the sink of `client`. Returns `true` if one was registered.
    pub fn remove(&self, client: ClientId) -> bool {
        self.sinks.remove(&client).is_some()
    }

    /// Whether a sink is registered for `client`.
    pub fn contains(&self, client: ClientId) -> bool {
        self.sinks.contains_key(&client)
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no client is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub(crate) fn deliver(
        &self,
        client: ClientId,
        path: &ResourcePath,
        value: Option<Arc<Payload>>,
    ) -> Delivery {
        // Clone the sink out so no shard lock is held while it runs.
        let Some(sink) = self.sinks.get(&client).map(|r| Arc::clone(r.value())) else {
            trace!(client = %client, path = %path, "no sink registered, skipping");
            return Delivery::NoSink;
        };

        // A panicking sink must not take the rest of the fan-out with it.
        match panic::catch_unwind(AssertUnwindSafe(|| sink.notify(path, value))) {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(SyncError::ClientClosed { .. })) => Delivery::Closed,
            Ok(Err(err)) => {
                warn!(client = %client, path = %path, error = %err, "notification failed");
                Delivery::Failed
            }
            Err(_) => {
                warn!(client = %client, path = %path, "notification sink panicked");
                Delivery::Failed
            }
        }
    }
}
