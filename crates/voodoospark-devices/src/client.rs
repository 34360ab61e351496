//! Device client capability interface.
//!
//! The adaptor never talks to the network itself. It drives a
//! [`DeviceClient`], obtained from a [`DeviceClientFactory`], which performs
//! authentication, transport and the low-level pin commands.
//!
//! ## Architecture
//!
//! ```text
//! VoodooSpark adaptor          DeviceClient              Cloud relay
//! ┌─────────────────┐         ┌──────────────┐          ┌──────────┐
//! │ ensure mode     │  calls  │ set_pin_mode │  HTTPS   │          │
//! │ scale value     │────────▶│ read / write │─────────▶│  Device  │
//! │ relay events    │◀────────│ events()     │◀─────────│          │
//! └─────────────────┘ stream  └──────────────┘   SSE    └──────────┘
//! ```

use crate::modes::{PinId, PinMode};
use crate::scaling::PinValue;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use voodoospark_core::{AdaptorConfig, AdaptorError, Credentials, DeviceEvent, Result};

/// Stream of events pushed by the device.
pub type EventStream = Pin<Box<dyn Stream<Item = DeviceEvent> + Send + 'static>>;

/// Device client trait.
///
/// Implementations own the connection and its I/O. Every method resolves
/// exactly once; errors are passed through to the adaptor's caller unchanged.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Get the client type identifier (e.g., "cloud", "simulated").
    fn client_type(&self) -> &str;

    /// Resolve once the device is reachable and ready for commands.
    async fn ready(&self) -> Result<()>;

    /// Put `pin` into `mode`.
    async fn set_pin_mode(&self, pin: PinId, mode: PinMode) -> Result<()>;

    /// Read a digital pin.
    async fn digital_read(&self, pin: PinId) -> Result<PinValue>;

    /// Write a digital pin.
    async fn digital_write(&self, pin: PinId, value: PinValue) -> Result<()>;

    /// Read an analog pin.
    async fn analog_read(&self, pin: PinId) -> Result<PinValue>;

    /// Pulse-width write (`0..=255`).
    async fn analog_write(&self, pin: PinId, value: PinValue) -> Result<()>;

    /// Angular write (`0..=180`).
    async fn servo_write(&self, pin: PinId, value: PinValue) -> Result<()>;

    /// Start delivering occurrences of the named event.
    async fn subscribe(&self, event_name: &str) -> Result<()>;

    /// Stream of pushed events for every active subscription.
    ///
    /// Multiple streams are supported; each receives every event.
    fn events(&self) -> EventStream;

    /// Invoke a cloud function exposed by the firmware.
    async fn call_function(&self, name: &str, _args: &str) -> Result<i64> {
        Err(AdaptorError::Unsupported(format!("function call '{}'", name)))
    }

    /// Read a cloud variable exposed by the firmware.
    async fn variable(&self, name: &str) -> Result<serde_json::Value> {
        Err(AdaptorError::Unsupported(format!("variable read '{}'", name)))
    }

    /// Release the connection and stop every subscription.
    async fn close(&self) -> Result<()>;
}

/// Dynamic device client wrapper for trait objects.
pub type DynDeviceClient = Arc<dyn DeviceClient>;

/// Builds connected device clients.
///
/// A seam so tests can substitute the network client with a double.
#[async_trait]
pub trait DeviceClientFactory: Send + Sync {
    /// Create a client addressing the device named by `credentials`.
    ///
    /// Readiness is awaited separately through [`DeviceClient::ready`].
    async fn create(
        &self,
        credentials: &Credentials,
        config: &AdaptorConfig,
    ) -> Result<DynDeviceClient>;
}

/// Shared factory handle.
pub type DynClientFactory = Arc<dyn DeviceClientFactory>;
