//! Cross-context sync bus backed by named tokio broadcast channels.
//!
//! A [`BroadcastHub`] plays the part of the runtime-provided multi-context
//! channel: every context that opens the same channel name talks over the same
//! broadcast sender. Each [`SyncBus`] endpoint carries its own [`ContextId`] so
//! subscribers can skip the echo of their own publications.
//!
//! Delivery is at-most-once: a lagging subscriber loses messages, and a
//! malformed payload is dropped. Consumers are expected to re-fetch rather
//! than trust the payload.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

use wecare_domain::error::WeCareError;
use wecare_domain::event::SyncEvent;

use crate::ports::SyncPublisher;

/// Channel name shared by every context of the application.
pub const DEFAULT_CHANNEL: &str = "patient-channel";

const DEFAULT_CAPACITY: usize = 64;

/// Identity of one context (one open tab) on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message as it travels on the channel: the JSON-encoded event plus the
/// context that sent it.
#[derive(Debug, Clone)]
struct Envelope {
    origin: ContextId,
    payload: String,
}

/// Registry of named broadcast channels shared between contexts.
#[derive(Clone)]
pub struct BroadcastHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Envelope>>>>,
    capacity: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastHub {
    /// Create a hub whose channels buffer up to `capacity` messages per
    /// subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "broadcast capacity must be non-zero");
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Join the channel called `name` as a new context.
    #[must_use]
    pub fn open(&self, name: &str) -> SyncBus {
        let sender = {
            let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
            channels
                .entry(name.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .clone()
        };
        let context = ContextId::new();
        tracing::debug!(channel = name, %context, "joined sync channel");
        SyncBus {
            name: name.to_string(),
            context,
            sender,
        }
    }
}

/// One context's endpoint on a named channel.
///
/// Clones share the same [`ContextId`]; open a new endpoint from the hub to
/// act as a different context.
#[derive(Clone)]
pub struct SyncBus {
    name: String,
    context: ContextId,
    sender: broadcast::Sender<Envelope>,
}

impl SyncBus {
    /// Channel name this endpoint is attached to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of this endpoint's context.
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Register `handler` for every event published by *other* contexts.
    ///
    /// Only messages sent after this call are delivered. The listener stays
    /// registered until the returned [`Subscription`] is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(SyncEvent) + Send + 'static,
    {
        let own = self.context;
        let channel = self.name.clone();
        let mut stream = BroadcastStream::new(self.sender.subscribe());

        let task = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(envelope) if envelope.origin == own => {}
                    Ok(envelope) => match serde_json::from_str::<SyncEvent>(&envelope.payload) {
                        Ok(event) => handler(event),
                        Err(err) => {
                            tracing::warn!(%err, channel = %channel, "dropping malformed sync message");
                        }
                    },
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            skipped,
                            channel = %channel,
                            "sync subscriber lagged, messages dropped"
                        );
                    }
                }
            }
        });

        Subscription { tasks: vec![task] }
    }

    #[cfg(test)]
    fn publish_raw(&self, payload: &str) {
        let _ = self.sender.send(Envelope {
            origin: ContextId::new(),
            payload: payload.to_string(),
        });
    }
}

impl SyncPublisher for SyncBus {
    fn publish(&self, event: SyncEvent) -> impl Future<Output = Result<(), WeCareError>> + Send {
        let result = serde_json::to_string(&event)
            .map_err(|err| WeCareError::Persistence(Box::new(err)))
            .map(|payload| {
                tracing::debug!(channel = %self.name, %payload, "publishing sync message");
                // send fails only when nobody listens, which is fine.
                let _ = self.sender.send(Envelope {
                    origin: self.context,
                    payload,
                });
            });
        async { result }
    }
}

/// Listener registration; dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Unregister the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
