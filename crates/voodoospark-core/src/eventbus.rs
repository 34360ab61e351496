//! Adaptor event bus.
//!
//! Lifecycle notifications and relayed device events are published on a
//! broadcast channel. Hosts subscribe to everything or to a filtered view.

use crate::config::defaults::EVENT_CHANNEL_CAPACITY;
use crate::event::{AdaptorEvent, EventMetadata};
use tokio::sync::broadcast;

/// Event bus for one or more adaptors.
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast channel sender
    tx: broadcast::Sender<(AdaptorEvent, EventMetadata)>,
    /// Event bus name for identification
    name: String,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_name("default")
    }

    /// Create a new event bus with a name.
    ///
    /// Up to `EVENT_CHANNEL_CAPACITY` events are buffered for slow subscribers.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            tx: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
            name: name.into(),
        }
    }

    /// Get the name of this event bus.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event from the given source.
    ///
    /// Returns `true` if there was at least one subscriber.
    pub fn publish(&self, event: AdaptorEvent, source: impl Into<String>) -> bool {
        self.tx.send((event, EventMetadata::new(source))).is_ok()
    }

    /// Subscribe to all events.
    ///
    /// If the subscriber falls behind, older events may be dropped.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to lifecycle notifications only.
    pub fn lifecycle_events(&self) -> FilteredReceiver<fn(&AdaptorEvent) -> bool> {
        let filter: fn(&AdaptorEvent) -> bool = AdaptorEvent::is_lifecycle;
        FilteredReceiver::new(self.tx.subscribe(), filter)
    }

    /// Subscribe to relayed device events with the given name.
    pub fn device_events(
        &self,
        name: impl Into<String>,
    ) -> FilteredReceiver<impl Fn(&AdaptorEvent) -> bool + Send + 'static> {
        let target = name.into();
        FilteredReceiver::new(self.tx.subscribe(), move |event: &AdaptorEvent| {
            event.event_name() == Some(target.as_str())
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for all events from the event bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(AdaptorEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the event bus is closed.
    pub async fn recv(&mut self) -> Option<(AdaptorEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event bus receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<(AdaptorEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver for filtered events from the event bus.
pub struct FilteredReceiver<F>
where
    F: Fn(&AdaptorEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(AdaptorEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&AdaptorEvent) -> bool + Send,
{
    fn new(rx: broadcast::Receiver<(AdaptorEvent, EventMetadata)>, filter: F) -> Self {
        Self { rx, filter }
    }

    /// Receive the next event matching the filter.
    ///
    /// Returns `None` if the event bus is closed.
    pub async fn recv(&mut self) -> Option<(AdaptorEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<(AdaptorEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }
}
