//! In-memory device client.
//!
//! Records every call it receives, serves reads from an in-memory pin table
//! and lets the caller push events as if the device had published them. Used
//! by the tests and by the CLI's `--simulate` mode.

use crate::client::{DeviceClient, DeviceClientFactory, DynDeviceClient, EventStream};
use crate::modes::{PinId, PinMode};
use crate::scaling::PinValue;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use voodoospark_core::{AdaptorConfig, AdaptorError, Credentials, DeviceEvent, Result};

/// A call received by [`SimulatedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    SetPinMode { pin: PinId, mode: PinMode },
    DigitalRead { pin: PinId },
    DigitalWrite { pin: PinId, value: PinValue },
    AnalogRead { pin: PinId },
    AnalogWrite { pin: PinId, value: PinValue },
    ServoWrite { pin: PinId, value: PinValue },
    Subscribe { event: String },
    CallFunction { name: String, args: String },
    Variable { name: String },
    Close,
}

impl ClientCall {
    /// Whether this call is a read or write against a pin.
    pub fn is_pin_io(&self) -> bool {
        matches!(
            self,
            Self::DigitalRead { .. }
                | Self::DigitalWrite { .. }
                | Self::AnalogRead { .. }
                | Self::AnalogWrite { .. }
                | Self::ServoWrite { .. }
        )
    }
}

/// Simulated device client.
pub struct SimulatedClient {
    device_id: String,
    calls: Mutex<Vec<ClientCall>>,
    pin_values: Mutex<HashMap<PinId, PinValue>>,
    functions: Mutex<HashMap<String, i64>>,
    variables: Mutex<HashMap<String, serde_json::Value>>,
    event_tx: broadcast::Sender<DeviceEvent>,
    fail_ready: AtomicBool,
    fail_mode_sets: AtomicBool,
    fail_io: AtomicBool,
    closed: AtomicBool,
}

impl SimulatedClient {
    /// Create a simulated client for `device_id`.
    pub fn new(device_id: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            device_id: device_id.into(),
            calls: Mutex::new(Vec::new()),
            pin_values: Mutex::new(HashMap::new()),
            functions: Mutex::new(HashMap::new()),
            variables: Mutex::new(HashMap::new()),
            event_tx,
            fail_ready: AtomicBool::new(false),
            fail_mode_sets: AtomicBool::new(false),
            fail_io: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Device this client pretends to address.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Preset the value returned by reads of `pin`.
    pub fn set_pin_value(&self, pin: PinId, value: PinValue) {
        self.pin_values.lock().insert(pin, value);
    }

    /// Last value written to or preset for `pin`.
    pub fn pin_value(&self, pin: PinId) -> Option<PinValue> {
        self.pin_values.lock().get(&pin).copied()
    }

    /// Expose a cloud function returning `value`.
    pub fn register_function(&self, name: impl Into<String>, value: i64) {
        self.functions.lock().insert(name.into(), value);
    }

    /// Expose a cloud variable.
    pub fn set_variable(&self, name: impl Into<String>, value: serde_json::Value) {
        self.variables.lock().insert(name.into(), value);
    }

    /// Make `ready` fail.
    pub fn fail_ready(&self, fail: bool) {
        self.fail_ready.store(fail, Ordering::Relaxed);
    }

    /// Make `set_pin_mode` fail.
    pub fn fail_mode_sets(&self, fail: bool) {
        self.fail_mode_sets.store(fail, Ordering::Relaxed);
    }

    /// Make pin reads and writes fail.
    pub fn fail_io(&self, fail: bool) {
        self.fail_io.store(fail, Ordering::Relaxed);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Push an event as if the device had published it.
    ///
    /// Returns the number of event streams that received it.
    pub fn push_event(&self, event: DeviceEvent) -> usize {
        self.event_tx.send(event).unwrap_or(0)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().clone()
    }

    /// Only the mode-set calls, as `(pin, mode)` pairs.
    pub fn mode_sets(&self) -> Vec<(PinId, PinMode)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ClientCall::SetPinMode { pin, mode } => Some((*pin, *mode)),
                _ => None,
            })
            .collect()
    }

    /// Only the pin read and write calls.
    pub fn io_calls(&self) -> Vec<ClientCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.is_pin_io())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: ClientCall) {
        self.calls.lock().push(call);
    }

    fn check_io(&self, what: &str, pin: PinId) -> Result<()> {
        if self.fail_io.load(Ordering::Relaxed) {
            return Err(AdaptorError::Operation(format!("{} failed on pin {}", what, pin)));
        }
        Ok(())
    }

    fn read(&self, pin: PinId) -> PinValue {
        self.pin_values.lock().get(&pin).copied().unwrap_or(0)
    }

    fn write(&self, pin: PinId, value: PinValue) {
        self.pin_values.lock().insert(pin, value);
    }
}

#[async_trait]
impl DeviceClient for SimulatedClient {
    fn client_type(&self) -> &str {
        "simulated"
    }

    async fn ready(&self) -> Result<()> {
        if self.fail_ready.load(Ordering::Relaxed) {
            return Err(AdaptorError::Connection(format!(
                "device {} is offline",
                self.device_id
            )));
        }
        self.closed.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn set_pin_mode(&self, pin: PinId, mode: PinMode) -> Result<()> {
        self.record(ClientCall::SetPinMode { pin, mode });
        if self.fail_mode_sets.load(Ordering::Relaxed) {
            return Err(AdaptorError::Operation(format!(
                "pinMode {} rejected on pin {}",
                mode, pin
            )));
        }
        Ok(())
    }

    async fn digital_read(&self, pin: PinId) -> Result<PinValue> {
        self.record(ClientCall::DigitalRead { pin });
        self.check_io("digitalRead", pin)?;
        Ok(self.read(pin))
    }

    async fn digital_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.record(ClientCall::DigitalWrite { pin, value });
        self.check_io("digitalWrite", pin)?;
        self.write(pin, value);
        Ok(())
    }

    async fn analog_read(&self, pin: PinId) -> Result<PinValue> {
        self.record(ClientCall::AnalogRead { pin });
        self.check_io("analogRead", pin)?;
        Ok(self.read(pin))
    }

    async fn analog_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.record(ClientCall::AnalogWrite { pin, value });
        self.check_io("analogWrite", pin)?;
        self.write(pin, value);
        Ok(())
    }

    async fn servo_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.record(ClientCall::ServoWrite { pin, value });
        self.check_io("servoWrite", pin)?;
        self.write(pin, value);
        Ok(())
    }

    async fn subscribe(&self, event_name: &str) -> Result<()> {
        self.record(ClientCall::Subscribe {
            event: event_name.to_string(),
        });
        Ok(())
    }

    fn events(&self) -> EventStream {
        let mut rx = self.event_tx.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn call_function(&self, name: &str, args: &str) -> Result<i64> {
        self.record(ClientCall::CallFunction {
            name: name.to_string(),
            args: args.to_string(),
        });
        self.functions
            .lock()
            .get(name)
            .copied()
            .ok_or_else(|| AdaptorError::Operation(format!("Function not found: {}", name)))
    }

    async fn variable(&self, name: &str) -> Result<serde_json::Value> {
        self.record(ClientCall::Variable {
            name: name.to_string(),
        });
        self.variables
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| AdaptorError::Operation(format!("Variable not found: {}", name)))
    }

    async fn close(&self) -> Result<()> {
        self.record(ClientCall::Close);
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Factory handing out a shared [`SimulatedClient`].
///
/// Every `create` returns the same client, so a test keeps an `Arc` to it and
/// inspects the calls the adaptor made.
pub struct SimulatedClientFactory {
    client: Arc<SimulatedClient>,
    created: AtomicUsize,
}

impl SimulatedClientFactory {
    /// Wrap an existing simulated client.
    pub fn new(client: Arc<SimulatedClient>) -> Self {
        Self {
            client,
            created: AtomicUsize::new(0),
        }
    }

    /// The shared client.
    pub fn client(&self) -> Arc<SimulatedClient> {
        self.client.clone()
    }

    /// How many times `create` was called.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DeviceClientFactory for SimulatedClientFactory {
    async fn create(
        &self,
        credentials: &Credentials,
        _config: &AdaptorConfig,
    ) -> Result<DynDeviceClient> {
        if credentials.device_id() != self.client.device_id() {
            return Err(AdaptorError::Connection(format!(
                "unknown device {}",
                credentials.device_id()
            )));
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        let client: DynDeviceClient = self.client.clone();
        Ok(client)
    }
}
