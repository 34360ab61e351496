//! Relay of device-published events to local listeners.

use crate::client::{DeviceClient, EventStream};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use voodoospark_core::{AdaptorEvent, DeviceEvent, EventBus, Result};

/// Callback invoked with each relayed event.
pub type Listener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Handle returned by [`EventRelay::on`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fans device events out to listeners registered by event name.
///
/// Listeners for the same name are notified in registration order.
#[derive(Default)]
pub struct EventRelay {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
    subscribed: Mutex<BTreeSet<String>>,
    next_id: AtomicU64,
}

impl EventRelay {
    /// Create a relay with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event_name`.
    pub fn on<F>(&self, event_name: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event_name.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let mut removed = false;
        listeners.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
            !entries.is_empty()
        });
        removed
    }

    /// Number of listeners registered for `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .read()
            .get(event_name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Ask the client to start delivering each named event.
    ///
    /// Names already subscribed are skipped, so each name is requested from
    /// the client at most once per connection.
    pub async fn listen_for_events<I, S>(&self, client: &dyn DeviceClient, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.subscribed.lock().insert(name.clone()) {
                debug!(event = %name, "already listening for device event");
                continue;
            }
            if let Err(e) = client.subscribe(&name).await {
                self.subscribed.lock().remove(&name);
                return Err(e);
            }
            info!(event = %name, "listening for device event");
        }
        Ok(())
    }

    /// Re-issue every current subscription on a new client.
    pub async fn resubscribe(&self, client: &dyn DeviceClient) -> Result<()> {
        for name in self.subscribed_events() {
            client.subscribe(&name).await?;
            debug!(event = %name, "resubscribed device event");
        }
        Ok(())
    }

    /// Event names the client has been asked to deliver.
    pub fn subscribed_events(&self) -> Vec<String> {
        self.subscribed.lock().iter().cloned().collect()
    }

    /// Forget subscriptions (listeners are kept).
    pub fn reset_subscriptions(&self) {
        self.subscribed.lock().clear();
    }

    /// Deliver `event` to every listener registered for its name.
    ///
    /// Returns the number of listeners invoked. The listener list is
    /// snapshotted first, so a listener may register or remove listeners.
    pub fn dispatch(&self, event: &DeviceEvent) -> usize {
        let targets: Vec<Listener> = match self.listeners.read().get(&event.name) {
            Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
            None => return 0,
        };

        for listener in &targets {
            listener(event);
        }
        targets.len()
    }

    /// Spawn a task feeding `stream` into [`dispatch`](Self::dispatch) and
    /// republishing every event on `bus`.
    pub fn spawn_forwarder(
        self: &Arc<Self>,
        mut stream: EventStream,
        bus: EventBus,
        source: String,
    ) -> JoinHandle<()> {
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let delivered = relay.dispatch(&event);
                debug!(event = %event.name, delivered, "relayed device event");
                bus.publish(AdaptorEvent::Event(event), source.as_str());
            }
            debug!(source = %source, "device event stream ended");
        })
    }
}
