//! Value scaling for write operations.
//!
//! Callers pass a logical level in `0.0..=1.0`. Pulse-width writes scale it
//! to `0..=255`, angular (servo) writes to `0..=180`.

use voodoospark_core::{AdaptorError, Result};

/// Raw value exchanged with the device client.
pub type PinValue = u16;

/// Upper bound of a pulse-width write.
pub const PULSE_WIDTH_MAX: PinValue = 255;

/// Upper bound of an angular write, in degrees.
pub const ANGULAR_MAX: PinValue = 180;

/// Scaling policy selected by the write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePolicy {
    /// `pwmWrite` / `analogWrite`
    PulseWidth,
    /// `servoWrite`
    Angular,
}

impl ScalePolicy {
    /// Largest value this policy produces.
    pub const fn max(self) -> PinValue {
        match self {
            Self::PulseWidth => PULSE_WIDTH_MAX,
            Self::Angular => ANGULAR_MAX,
        }
    }

    /// Scale a logical level: `level * max`, rounded to the nearest integer.
    ///
    /// Levels outside `0.0..=1.0` (and NaN) are rejected.
    pub fn scale(self, level: f64) -> Result<PinValue> {
        if !level.is_finite() || !(0.0..=1.0).contains(&level) {
            return Err(AdaptorError::InvalidValue(format!(
                "level {} is outside 0..=1",
                level
            )));
        }
        Ok((level * f64::from(self.max())).round() as PinValue)
    }
}

/// Scale a level for a pulse-width write.
pub fn pulse_width(level: f64) -> Result<PinValue> {
    ScalePolicy::PulseWidth.scale(level)
}

/// Scale a level for an angular write.
pub fn angular(level: f64) -> Result<PinValue> {
    ScalePolicy::Angular.scale(level)
}

/// Symbolic name of a digital level: `"HIGH"` for 1, `"LOW"` otherwise.
pub fn pin_val(value: i64) -> &'static str {
    if value == 1 {
        "HIGH"
    } else {
        "LOW"
    }
}
