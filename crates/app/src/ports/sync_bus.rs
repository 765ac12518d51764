//! Sync bus port — publishing mutation notifications to other contexts.

use std::future::Future;

use wecare_domain::error::WeCareError;
use wecare_domain::event::SyncEvent;

/// Publishes [`SyncEvent`]s to every other context listening on the bus.
pub trait SyncPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: SyncEvent) -> impl Future<Output = Result<(), WeCareError>> + Send;
}

impl<T: SyncPublisher + Send + Sync> SyncPublisher for std::sync::Arc<T> {
    fn publish(&self, event: SyncEvent) -> impl Future<Output = Result<(), WeCareError>> + Send {
        (**self).publish(event)
    }
}
