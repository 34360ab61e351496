//! Server-sent-events decoding for the cloud event stream.
//!
//! The relay streams published events as
//!
//! ```text
//! event: testevent
//! data: {"data":"23","ttl":60,"published_at":"2024-05-01T10:00:00.000Z","coreid":"abc"}
//!
//! ```
//!
//! interleaved with `:ok` comment lines used as keep-alives. Chunks from the
//! HTTP body may split lines (or UTF-8 sequences) anywhere.

use serde::Deserialize;
use voodoospark_core::DeviceEvent;

/// One dispatched SSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// Value of the `event:` field, if present
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Incremental SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk, returning every message it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let text: &str = &text;
            let line = text.strip_suffix('\r').unwrap_or(text);
            if let Some(message) = self.process_line(line) {
                messages.push(message);
            }
        }
        messages
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseMessage { event, data })
    }
}

/// Envelope the relay wraps around each published payload.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    ttl: Option<serde_json::Value>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    coreid: Option<String>,
}

/// Convert an SSE message into a device event.
///
/// Messages without an event name are dropped. A data field that is not a
/// relay envelope is passed through as the raw payload.
pub fn to_device_event(message: SseMessage) -> Option<DeviceEvent> {
    let name = message.event?;
    let event = match serde_json::from_str::<EventEnvelope>(&message.data) {
        Ok(envelope) => DeviceEvent {
            name,
            data: envelope.data.unwrap_or_default(),
            ttl: envelope.ttl.as_ref().and_then(parse_ttl),
            published_at: envelope.published_at,
            core_id: envelope.coreid,
        },
        Err(_) => DeviceEvent::new(name, message.data),
    };
    Some(event)
}

// The relay has sent ttl both as a number and as a string.
fn parse_ttl(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
