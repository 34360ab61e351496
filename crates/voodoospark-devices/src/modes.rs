//! Pin operating modes and per-pin mode tracking.
//!
//! Every pin operation first makes sure the pin is in the mode it needs. The
//! tracker remembers the last mode applied to each pin so a mode-set is only
//! sent when the required mode is unknown or different.
//!
//! Each pin has its own async lock. An operation holds it from the mode check
//! until the read or write completes, so two operations on the same pin can
//! never interleave a mode change between another operation's mode-set and
//! its I/O.

use crate::client::DeviceClient;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use voodoospark_core::Result;

/// Pin identifier.
pub type PinId = u8;

/// Operating configuration of a physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinMode {
    Input,
    Output,
    Analog,
    Pwm,
    Servo,
}

impl PinMode {
    /// Mode name understood by the device firmware.
    pub fn firmware_name(&self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::Analog => "ANALOG",
            Self::Pwm => "PWM",
            Self::Servo => "SERVO",
        }
    }

    /// Numeric mode code used by the firmware protocol.
    pub fn code(&self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Output => 1,
            Self::Analog => 2,
            Self::Pwm => 3,
            Self::Servo => 4,
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.firmware_name())
    }
}

type PinSlot = Arc<AsyncMutex<Option<PinMode>>>;

/// Records the last mode applied to each pin.
#[derive(Default)]
pub struct ModeTracker {
    pins: Mutex<HashMap<PinId, PinSlot>>,
}

impl ModeTracker {
    /// Create an empty tracker. Every pin starts with an unknown mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take exclusive access to one pin.
    ///
    /// The returned guard must be held until the pin operation completes.
    pub async fn acquire(&self, pin: PinId) -> PinGuard {
        let slot = self.pins.lock().entry(pin).or_default().clone();
        PinGuard {
            pin,
            slot: slot.lock_owned().await,
        }
    }

    /// Ensure `pin` is in `required` mode, returning whether a mode-set was sent.
    pub async fn ensure_mode(
        &self,
        client: &dyn DeviceClient,
        pin: PinId,
        required: PinMode,
    ) -> Result<bool> {
        self.acquire(pin).await.ensure_mode(client, required).await
    }

    /// Last mode recorded for `pin`, if any.
    pub async fn mode(&self, pin: PinId) -> Option<PinMode> {
        self.acquire(pin).await.mode()
    }

    /// Number of pins that have been used.
    pub fn tracked_pins(&self) -> usize {
        self.pins.lock().len()
    }

    /// Forget every recorded mode.
    ///
    /// Each pin is reset under its own lock, so this waits for in-flight
    /// operations to finish and never hands a second caller a fresh slot for
    /// a pin that is still locked.
    pub async fn clear(&self) {
        let slots: Vec<PinSlot> = self.pins.lock().values().cloned().collect();
        for slot in slots {
            *slot.lock().await = None;
        }
    }
}

/// Exclusive access to one pin's mode record.
pub struct PinGuard {
    pin: PinId,
    slot: OwnedMutexGuard<Option<PinMode>>,
}

impl PinGuard {
    /// The guarded pin.
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Recorded mode, `None` when unknown.
    pub fn mode(&self) -> Option<PinMode> {
        *self.slot
    }

    /// Issue a mode-set unless the pin is already in `required` mode.
    ///
    /// The new mode is recorded only after the client accepted the mode-set.
    pub async fn ensure_mode(&mut self, client: &dyn DeviceClient, required: PinMode) -> Result<bool> {
        if *self.slot == Some(required) {
            return Ok(false);
        }

        client.set_pin_mode(self.pin, required).await?;
        let previous = *self.slot;
        debug!(pin = self.pin, from = ?previous, to = %required, "pin mode changed");
        *self.slot = Some(required);
        Ok(true)
    }
}
