//! Core traits and types for VoodooSpark.
//!
//! This crate defines the host-facing adaptor interface, the shared error
//! type, configuration, and the adaptor event bus.

pub mod adaptor;
pub mod config;
pub mod error;
pub mod event;
pub mod eventbus;

pub use adaptor::{Adaptor, Command, ConnectionStatus, DynAdaptor};
pub use config::{AdaptorConfig, Credentials};
pub use error::{AdaptorError, Result};
pub use event::{AdaptorEvent, DeviceEvent, EventMetadata};
pub use eventbus::{EventBus, EventBusReceiver, FilteredReceiver};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::adaptor::{Adaptor, Command, ConnectionStatus};
    pub use crate::config::{endpoints, env_vars, AdaptorConfig, Credentials};
    pub use crate::error::{AdaptorError, Result};
    pub use crate::event::{AdaptorEvent, DeviceEvent};
    pub use crate::eventbus::EventBus;
}
