//! VoodooSpark adaptor.
//!
//! Translates pin-level intents into device client calls. Each operation
//! follows the same steps: take the pin, ensure its mode, scale the value
//! when the write needs it, then delegate to the client.
//!
//! ```rust,ignore
//! use voodoospark_core::{Adaptor, AdaptorConfig};
//! use voodoospark_devices::VoodooSpark;
//!
//! let spark = VoodooSpark::with_cloud(AdaptorConfig::new("device-id", "token"))?;
//! spark.connect().await?;
//! spark.digital_write(7, 1).await?;
//! spark.servo_write(2, 0.5).await?;
//! ```

use crate::client::{DynClientFactory, DynDeviceClient};
use crate::modes::{ModeTracker, PinId, PinMode};
use crate::relay::{EventRelay, ListenerId};
use crate::scaling::{self, PinValue};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use voodoospark_core::{
    Adaptor, AdaptorConfig, AdaptorError, AdaptorEvent, Command, ConnectionStatus, Credentials,
    DeviceEvent, EventBus, EventBusReceiver, Result,
};

/// Adaptor type identifier.
pub const ADAPTOR_TYPE: &str = "voodoospark";

/// Adaptor for a VoodooSpark device reached through a cloud relay.
pub struct VoodooSpark {
    name: String,
    credentials: Credentials,
    config: AdaptorConfig,
    factory: DynClientFactory,
    client: RwLock<Option<DynDeviceClient>>,
    status: RwLock<ConnectionStatus>,
    modes: ModeTracker,
    relay: Arc<EventRelay>,
    event_bus: EventBus,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl VoodooSpark {
    /// Create an adaptor.
    ///
    /// Fails with [`AdaptorError::Configuration`] when the device id or
    /// access token is missing or empty. No network activity happens here.
    pub fn new(config: AdaptorConfig, factory: DynClientFactory) -> Result<Self> {
        let credentials = config.credentials()?;
        Ok(Self {
            name: format!("{}:{}", ADAPTOR_TYPE, credentials.device_id()),
            credentials,
            config,
            factory,
            client: RwLock::new(None),
            status: RwLock::new(ConnectionStatus::Disconnected),
            modes: ModeTracker::new(),
            relay: Arc::new(EventRelay::new()),
            event_bus: EventBus::with_name(ADAPTOR_TYPE),
            forwarder: Mutex::new(None),
        })
    }

    /// Create an adaptor backed by the cloud relay client.
    #[cfg(feature = "cloud")]
    pub fn with_cloud(config: AdaptorConfig) -> Result<Self> {
        Self::new(config, Arc::new(crate::cloud::CloudClientFactory::new()))
    }

    /// Publish lifecycle and relayed events on `bus` instead of a private one.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    /// Override the adaptor name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Device identifier.
    pub fn device_id(&self) -> &str {
        self.credentials.device_id()
    }

    /// Cloud access token.
    pub fn access_token(&self) -> &str {
        self.credentials.access_token()
    }

    /// Validated credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Configuration the adaptor was built with.
    pub fn config(&self) -> &AdaptorConfig {
        &self.config
    }

    /// Interval hosts should use when polling reads.
    pub fn read_interval(&self) -> Duration {
        self.config.read_interval()
    }

    /// Whether a client handle is held.
    pub fn is_connected(&self) -> bool {
        self.client.read().is_some()
    }

    /// Event bus carrying `Ready`, `Disconnected` and relayed events.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to every notification from this adaptor.
    pub fn subscribe(&self) -> EventBusReceiver {
        self.event_bus.subscribe()
    }

    /// Last mode recorded for `pin` on the current connection.
    pub async fn pin_mode(&self, pin: PinId) -> Option<PinMode> {
        self.modes.mode(pin).await
    }

    /// Symbolic name of a digital level.
    pub fn pin_val(&self, value: i64) -> &'static str {
        scaling::pin_val(value)
    }

    fn client(&self) -> Result<DynDeviceClient> {
        self.client.read().clone().ok_or(AdaptorError::NotConnected)
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }

    fn source(&self) -> String {
        format!("adaptor:{}", self.device_id())
    }

    // ------------------------------------------------------------------
    // Pin operations
    // ------------------------------------------------------------------

    /// Read a digital pin (INPUT mode).
    pub async fn digital_read(&self, pin: PinId) -> Result<PinValue> {
        let client = self.client()?;
        let mut guard = self.modes.acquire(pin).await;
        guard.ensure_mode(client.as_ref(), PinMode::Input).await?;
        client.digital_read(pin).await
    }

    /// Write a digital pin (OUTPUT mode). The value is sent unscaled.
    pub async fn digital_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        let client = self.client()?;
        let mut guard = self.modes.acquire(pin).await;
        guard.ensure_mode(client.as_ref(), PinMode::Output).await?;
        client.digital_write(pin, value).await
    }

    /// Read an analog pin (ANALOG mode).
    pub async fn analog_read(&self, pin: PinId) -> Result<PinValue> {
        let client = self.client()?;
        let mut guard = self.modes.acquire(pin).await;
        guard.ensure_mode(client.as_ref(), PinMode::Analog).await?;
        client.analog_read(pin).await
    }

    /// Pulse-width write; identical to [`pwm_write`](Self::pwm_write).
    pub async fn analog_write(&self, pin: PinId, level: f64) -> Result<()> {
        self.pwm_write(pin, level).await
    }

    /// Pulse-width write (PWM mode). `level` is scaled to `0..=255`.
    pub async fn pwm_write(&self, pin: PinId, level: f64) -> Result<()> {
        let value = scaling::pulse_width(level)?;
        let client = self.client()?;
        let mut guard = self.modes.acquire(pin).await;
        guard.ensure_mode(client.as_ref(), PinMode::Pwm).await?;
        client.analog_write(pin, value).await
    }

    /// Angular write (SERVO mode). `level` is scaled to `0..=180`.
    pub async fn servo_write(&self, pin: PinId, level: f64) -> Result<()> {
        let value = scaling::angular(level)?;
        let client = self.client()?;
        let mut guard = self.modes.acquire(pin).await;
        guard.ensure_mode(client.as_ref(), PinMode::Servo).await?;
        client.servo_write(pin, value).await
    }

    // ------------------------------------------------------------------
    // Events and cloud calls
    // ------------------------------------------------------------------

    /// Ask the device to deliver each named event.
    pub async fn listen_for_events<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = self.client()?;
        self.relay.listen_for_events(client.as_ref(), names).await
    }

    /// Register a listener for a named device event.
    pub fn on<F>(&self, event_name: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.relay.on(event_name, listener)
    }

    /// Remove a listener registered with [`on`](Self::on).
    pub fn off(&self, id: ListenerId) -> bool {
        self.relay.off(id)
    }

    /// Event names the device has been asked to deliver.
    pub fn subscribed_events(&self) -> Vec<String> {
        self.relay.subscribed_events()
    }

    /// Invoke a cloud function exposed by the firmware.
    pub async fn call_function(&self, name: &str, args: &[&str]) -> Result<i64> {
        let client = self.client()?;
        client.call_function(name, &args.join(",")).await
    }

    /// Read a cloud variable exposed by the firmware.
    pub async fn variable(&self, name: &str) -> Result<serde_json::Value> {
        let client = self.client()?;
        client.variable(name).await
    }
}

#[async_trait]
impl Adaptor for VoodooSpark {
    fn name(&self) -> &str {
        &self.name
    }

    fn adaptor_type(&self) -> &'static str {
        ADAPTOR_TYPE
    }

    async fn connect(&self) -> Result<()> {
        info!(device_id = %self.device_id(), "connecting to device");
        self.set_status(ConnectionStatus::Connecting);

        let client = match self.factory.create(&self.credentials, &self.config).await {
            Ok(client) => client,
            Err(e) => {
                self.set_status(ConnectionStatus::Error);
                return Err(e);
            }
        };
        if let Err(e) = client.ready().await {
            self.set_status(ConnectionStatus::Error);
            return Err(e);
        }

        let forwarder =
            self.relay
                .spawn_forwarder(client.events(), self.event_bus.clone(), self.source());

        // A replaced connection took its event streams with it.
        if let Err(e) = self.relay.resubscribe(client.as_ref()).await {
            forwarder.abort();
            if let Err(close_err) = client.close().await {
                warn!(error = %close_err, "failed to close new connection");
            }
            self.set_status(ConnectionStatus::Error);
            return Err(e);
        }

        if let Some(previous) = self.forwarder.lock().replace(forwarder) {
            previous.abort();
        }
        let previous = self.client.write().replace(client);
        self.modes.clear().await;

        if let Some(previous) = previous {
            warn!(device_id = %self.device_id(), "connect called twice, replacing connection");
            if let Err(e) = previous.close().await {
                warn!(error = %e, "failed to close previous connection");
            }
        }

        self.set_status(ConnectionStatus::Connected);
        info!(device_id = %self.device_id(), "device ready");
        self.event_bus.publish(
            AdaptorEvent::Ready {
                device_id: self.device_id().to_string(),
                timestamp: chrono::Utc::now().timestamp(),
            },
            self.source(),
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(forwarder) = self.forwarder.lock().take() {
            forwarder.abort();
        }
        let client = self.client.write().take();
        self.modes.clear().await;
        self.relay.reset_subscriptions();
        self.set_status(ConnectionStatus::Disconnected);

        let Some(client) = client else {
            return Ok(());
        };

        info!(device_id = %self.device_id(), "disconnecting from device");
        let result = client.close().await;
        self.event_bus.publish(
            AdaptorEvent::Disconnected {
                device_id: self.device_id().to_string(),
                timestamp: chrono::Utc::now().timestamp(),
            },
            self.source(),
        );
        result
    }

    fn commands(&self) -> &'static [Command] {
        &Command::ALL
    }

    fn connection_status(&self) -> ConnectionStatus {
        *self.status.read()
    }
}
