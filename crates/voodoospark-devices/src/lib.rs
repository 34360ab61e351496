//! VoodooSpark device adaptor.
//!
//! Exposes pin-level I/O (digital and analog reads and writes, PWM, servo)
//! and named device events for a microcontroller reached through a cloud
//! relay.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cloud` | ✅ | Cloud relay client over HTTPS and server-sent events |
//!
//! ## Architecture
//!
//! - **VoodooSpark**: the adaptor; owns the connection and dispatches operations
//! - **ModeTracker**: remembers each pin's mode so mode-sets are only sent on change
//! - **scaling**: maps logical levels to pulse-width and angular ranges
//! - **EventRelay**: fans device events out to listeners by name
//! - **DeviceClient / DeviceClientFactory**: the seam to the network client

pub mod client;
pub mod modes;
pub mod relay;
pub mod scaling;
pub mod simulated;
pub mod spark;

#[cfg(feature = "cloud")]
pub mod cloud;

pub use client::{DeviceClient, DeviceClientFactory, DynClientFactory, DynDeviceClient, EventStream};
pub use modes::{ModeTracker, PinGuard, PinId, PinMode};
pub use relay::{EventRelay, Listener, ListenerId};
pub use scaling::{pin_val, PinValue, ScalePolicy};
pub use simulated::{ClientCall, SimulatedClient, SimulatedClientFactory};
pub use spark::{VoodooSpark, ADAPTOR_TYPE};

#[cfg(feature = "cloud")]
pub use cloud::{CloudClient, CloudClientFactory};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
