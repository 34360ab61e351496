//! Host-facing adaptor interface.
//!
//! A host discovers an adaptor's operations through [`Adaptor::commands`] and
//! drives its lifecycle through `connect`/`disconnect`. Pin-level operations
//! live on the concrete adaptor types.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operations an adaptor exposes to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    DigitalRead,
    DigitalWrite,
    AnalogRead,
    AnalogWrite,
    PwmWrite,
    ServoWrite,
}

impl Command {
    /// Every command, in the order hosts see them.
    pub const ALL: [Command; 6] = [
        Command::DigitalRead,
        Command::DigitalWrite,
        Command::AnalogRead,
        Command::AnalogWrite,
        Command::PwmWrite,
        Command::ServoWrite,
    ];

    /// The name hosts use to invoke this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitalRead => "digitalRead",
            Self::DigitalWrite => "digitalWrite",
            Self::AnalogRead => "analogRead",
            Self::AnalogWrite => "analogWrite",
            Self::PwmWrite => "pwmWrite",
            Self::ServoWrite => "servoWrite",
        }
    }

    /// Whether the command reads a value back from the device.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::DigitalRead | Self::AnalogRead)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| format!("Unknown command: {}", s))
    }
}

/// Adaptor connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No connection handle
    Disconnected,
    /// Waiting for the device to signal readiness
    Connecting,
    /// Connected and operational
    Connected,
    /// The last connection attempt failed
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Adaptor trait.
///
/// The fixed capability interface a host expects from every hardware adaptor.
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// Get the adaptor name.
    fn name(&self) -> &str;

    /// Get the adaptor type identifier (e.g., "voodoospark").
    fn adaptor_type(&self) -> &'static str {
        "base"
    }

    /// Establish the device connection.
    ///
    /// Resolves once the device has signalled readiness.
    async fn connect(&self) -> Result<()>;

    /// Release the device connection. Succeeds even if never connected.
    async fn disconnect(&self) -> Result<()>;

    /// Commands this adaptor supports.
    fn commands(&self) -> &'static [Command];

    /// Current connection status.
    fn connection_status(&self) -> ConnectionStatus;
}

/// Dynamic adaptor wrapper for trait objects.
pub type DynAdaptor = std::sync::Arc<dyn Adaptor>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        let names: Vec<&str> = Command::ALL.iter().map(Command::as_str).collect();
        assert_eq!(
            names,
            vec![
                "digitalRead",
                "digitalWrite",
                "analogRead",
                "analogWrite",
                "pwmWrite",
                "servoWrite"
            ]
        );
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("pwmWrite".parse::<Command>(), Ok(Command::PwmWrite));
        assert!("callFunction".parse::<Command>().is_err());
    }

    #[test]
    fn test_command_serde_matches_display() {
        let json = serde_json::to_string(&Command::ServoWrite).unwrap();
        assert_eq!(json, "\"servoWrite\"");
    }

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
    }
}
