//! Cloud relay device client.
//!
//! Talks to a Particle-style REST API. Pin commands are issued as calls to
//! cloud functions the VoodooSpark firmware exposes (`pinMode`,
//! `digitalWrite`, ...), each taking a `"<pin>,<value>"` argument and
//! returning a non-negative integer on success. Device events arrive over a
//! server-sent-events stream, one HTTP stream per subscribed name.
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | readiness | `GET  /v1/devices/{id}` |
//! | function  | `POST /v1/devices/{id}/{function}` form `arg=...` |
//! | variable  | `GET  /v1/devices/{id}/{variable}` |
//! | events    | `GET  /v1/devices/{id}/events/{name}` (SSE) |

pub mod sse;

use crate::client::{DeviceClient, DeviceClientFactory, DynDeviceClient, EventStream};
use crate::modes::{PinId, PinMode};
use crate::scaling::PinValue;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use voodoospark_core::config::endpoints;
use voodoospark_core::{AdaptorConfig, AdaptorError, Credentials, DeviceEvent, Result};

use self::sse::{to_device_event, SseDecoder};

/// Firmware function names used for pin commands.
pub mod functions {
    pub const PIN_MODE: &str = "pinMode";
    pub const DIGITAL_READ: &str = "digitalRead";
    pub const DIGITAL_WRITE: &str = "digitalWrite";
    pub const ANALOG_READ: &str = "analogRead";
    pub const ANALOG_WRITE: &str = "analogWrite";
    pub const SERVO_WRITE: &str = "servoWrite";
}

/// Device status as returned by the readiness endpoint.
#[derive(Debug, Deserialize)]
struct DeviceInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    connected: bool,
}

/// Result of a cloud function call.
#[derive(Debug, Deserialize)]
struct FunctionResponse {
    return_value: i64,
}

/// Result of a cloud variable read.
#[derive(Debug, Deserialize)]
struct VariableResponse {
    result: serde_json::Value,
}

/// Cloud relay device client.
pub struct CloudClient {
    http: Client,
    base_url: String,
    device_id: String,
    access_token: String,
    read_interval: Duration,
    request_timeout: Duration,
    event_tx: broadcast::Sender<DeviceEvent>,
    streams: Mutex<HashMap<String, JoinHandle<()>>>,
    connected: AtomicBool,
}

impl CloudClient {
    /// Create a client for one device.
    pub fn new(http: Client, credentials: &Credentials, config: &AdaptorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self {
            http,
            base_url: config.api_base_url.clone(),
            device_id: credentials.device_id().to_string(),
            access_token: credentials.access_token().to_string(),
            read_interval: config.read_interval(),
            request_timeout: config.request_timeout(),
            event_tx,
            streams: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(false),
        }
    }

    /// Whether the device was online at the last readiness check.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn device_url(&self) -> String {
        format!(
            "{}/{}/devices/{}",
            self.base_url,
            endpoints::API_VERSION,
            self.device_id
        )
    }

    fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}", self.device_url(), resource)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdaptorError::Timeout(self.request_timeout.as_millis() as u64)
                } else {
                    AdaptorError::Connection(format!("HTTP request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(AdaptorError::Operation(format!(
                "HTTP error: {}",
                response.status()
            )));
        }
        Ok(response)
    }

    /// Call a firmware function and return its raw result.
    async fn call(&self, function: &str, arg: &str) -> Result<i64> {
        let request = self
            .http
            .post(self.resource_url(function))
            .form(&[("arg", arg)]);
        let body: FunctionResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| AdaptorError::Operation(format!("JSON parse error: {}", e)))?;
        debug!(function, arg, result = body.return_value, "cloud function returned");
        Ok(body.return_value)
    }

    /// Call a pin command; negative results are firmware-reported failures.
    async fn pin_command(&self, function: &str, arg: String) -> Result<PinValue> {
        let value = self.call(function, &arg).await?;
        PinValue::try_from(value).map_err(|_| {
            AdaptorError::Operation(format!("{}({}) returned {}", function, arg, value))
        })
    }

    async fn device_info(&self) -> Result<DeviceInfo> {
        self.send(self.http.get(self.device_url()))
            .await?
            .json()
            .await
            .map_err(|e| AdaptorError::Connection(format!("JSON parse error: {}", e)))
    }

    fn spawn_event_stream(&self, event_name: String) -> JoinHandle<()> {
        let request = self
            .authorized(self.http.get(self.resource_url(&format!("events/{}", event_name))))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let response = match request.send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    warn!(event = %event_name, status = %response.status(), "event stream rejected");
                    return;
                }
                Err(e) => {
                    warn!(event = %event_name, error = %e, "event stream failed");
                    return;
                }
            };

            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(event = %event_name, error = %e, "event stream interrupted");
                        break;
                    }
                };
                for message in decoder.feed(&chunk) {
                    // The relay matches subscriptions by prefix; each stream
                    // only forwards its own name.
                    let Some(event) = to_device_event(message) else {
                        continue;
                    };
                    if event.name != event_name {
                        continue;
                    }
                    // No receivers just means nobody is listening yet.
                    let _ = tx.send(event);
                }
            }
            debug!(event = %event_name, "event stream closed");
        })
    }
}

#[async_trait]
impl DeviceClient for CloudClient {
    fn client_type(&self) -> &str {
        "cloud"
    }

    /// Poll the device status every read interval until it reports online
    /// or the request timeout elapses.
    async fn ready(&self) -> Result<()> {
        let deadline = Instant::now() + self.request_timeout;
        loop {
            let info = self.device_info().await?;
            if info.connected {
                self.connected.store(true, Ordering::Relaxed);
                info!(
                    device_id = %self.device_id,
                    name = info.name.as_deref().unwrap_or("unnamed"),
                    "device online"
                );
                return Ok(());
            }
            if Instant::now() + self.read_interval > deadline {
                return Err(AdaptorError::Connection(format!(
                    "device {} is not online",
                    self.device_id
                )));
            }
            tokio::time::sleep(self.read_interval).await;
        }
    }

    async fn set_pin_mode(&self, pin: PinId, mode: PinMode) -> Result<()> {
        self.pin_command(functions::PIN_MODE, format!("{},{}", pin, mode.firmware_name()))
            .await
            .map(|_| ())
    }

    async fn digital_read(&self, pin: PinId) -> Result<PinValue> {
        self.pin_command(functions::DIGITAL_READ, pin.to_string()).await
    }

    async fn digital_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.pin_command(functions::DIGITAL_WRITE, format!("{},{}", pin, value))
            .await
            .map(|_| ())
    }

    async fn analog_read(&self, pin: PinId) -> Result<PinValue> {
        self.pin_command(functions::ANALOG_READ, pin.to_string()).await
    }

    async fn analog_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.pin_command(functions::ANALOG_WRITE, format!("{},{}", pin, value))
            .await
            .map(|_| ())
    }

    async fn servo_write(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.pin_command(functions::SERVO_WRITE, format!("{},{}", pin, value))
            .await
            .map(|_| ())
    }

    async fn subscribe(&self, event_name: &str) -> Result<()> {
        let mut streams = self.streams.lock();
        if streams
            .get(event_name)
            .is_some_and(|handle| !handle.is_finished())
        {
            debug!(event = %event_name, "event stream already open");
            return Ok(());
        }
        let handle = self.spawn_event_stream(event_name.to_string());
        streams.insert(event_name.to_string(), handle);
        Ok(())
    }

    fn events(&self) -> EventStream {
        let mut rx = self.event_tx.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "device event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn call_function(&self, name: &str, args: &str) -> Result<i64> {
        self.call(name, args).await
    }

    async fn variable(&self, name: &str) -> Result<serde_json::Value> {
        let body: VariableResponse = self
            .send(self.http.get(self.resource_url(name)))
            .await?
            .json()
            .await
            .map_err(|e| AdaptorError::Operation(format!("JSON parse error: {}", e)))?;
        Ok(body.result)
    }

    async fn close(&self) -> Result<()> {
        for (_, handle) in self.streams.lock().drain() {
            handle.abort();
        }
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for CloudClient {
    fn drop(&mut self) {
        for (_, handle) in self.streams.get_mut().drain() {
            handle.abort();
        }
    }
}

/// Factory producing [`CloudClient`]s that share one HTTP connection pool.
#[derive(Clone, Default)]
pub struct CloudClientFactory {
    http: Client,
}

impl CloudClientFactory {
    /// Create a factory with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory using an existing HTTP client.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeviceClientFactory for CloudClientFactory {
    async fn create(
        &self,
        credentials: &Credentials,
        config: &AdaptorConfig,
    ) -> Result<DynDeviceClient> {
        let client: DynDeviceClient =
            std::sync::Arc::new(CloudClient::new(self.http.clone(), credentials, config));
        Ok(client)
    }
}
