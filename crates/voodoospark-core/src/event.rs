//! Events carried by the adaptor event bus.

use serde::{Deserialize, Serialize};

/// One event published by the device and delivered through the cloud relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// Event name as published by the firmware
    pub name: String,
    /// Opaque payload
    pub data: String,
    /// Time-to-live in seconds, if the relay reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// Publish time as reported by the relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Id of the publishing device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_id: Option<String>,
}

impl DeviceEvent {
    /// Create an event with just a name and payload.
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            ttl: None,
            published_at: None,
            core_id: None,
        }
    }

    /// Set the publishing device.
    pub fn with_core_id(mut self, core_id: impl Into<String>) -> Self {
        self.core_id = Some(core_id.into());
        self
    }
}

/// Notification emitted by an adaptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptorEvent {
    /// The device signalled readiness after `connect`
    Ready { device_id: String, timestamp: i64 },

    /// The connection was released
    Disconnected { device_id: String, timestamp: i64 },

    /// A subscribed device event was relayed
    Event(DeviceEvent),
}

impl AdaptorEvent {
    /// Short type name, used for logging and filtering.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "Ready",
            Self::Disconnected { .. } => "Disconnected",
            Self::Event(_) => "Event",
        }
    }

    /// Whether this is a lifecycle notification.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::Disconnected { .. })
    }

    /// Relayed device event name, if any.
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Event(event) => Some(&event.name),
            _ => None,
        }
    }
}

/// Metadata attached to every published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    /// Who published the event (e.g. `adaptor:<device id>`)
    pub source: String,
    /// Unix timestamp (milliseconds)
    pub timestamp: i64,
}

impl EventMetadata {
    /// Create metadata stamped with the current time.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
