//! VoodooSpark adaptor tests.
//!
//! Tests the adaptor against the simulated client:
//! - Construction and credential validation
//! - Connection lifecycle
//! - Mode tracking and value scaling per command
//! - Error propagation

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use voodoospark_core::{Adaptor, AdaptorConfig, AdaptorError, AdaptorEvent, ConnectionStatus};
use voodoospark_devices::{
    ClientCall, PinMode, SimulatedClient, SimulatedClientFactory, VoodooSpark,
};

fn setup() -> (VoodooSpark, Arc<SimulatedClient>, Arc<SimulatedClientFactory>) {
    let client = Arc::new(SimulatedClient::new("deviceId"));
    let factory = Arc::new(SimulatedClientFactory::new(client.clone()));
    let config = AdaptorConfig::new("deviceId", "accessToken").with_read_interval(1000);
    let spark = VoodooSpark::new(config, factory.clone()).unwrap();
    (spark, client, factory)
}

async fn connected() -> (VoodooSpark, Arc<SimulatedClient>) {
    let (spark, client, _) = setup();
    spark.connect().await.unwrap();
    (spark, client)
}

fn factory() -> Arc<SimulatedClientFactory> {
    Arc::new(SimulatedClientFactory::new(Arc::new(SimulatedClient::new("deviceId"))))
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_constructor_stores_credentials() {
    let (spark, _, _) = setup();
    assert_eq!(spark.device_id(), "deviceId");
    assert_eq!(spark.access_token(), "accessToken");
    assert_eq!(spark.read_interval(), Duration::from_millis(1000));
}

#[test]
fn test_constructor_without_device_id() {
    let config = AdaptorConfig::from_params(&serde_json::json!({ "accessToken": "" })).unwrap();
    let err = VoodooSpark::new(config, factory()).err().unwrap();
    assert_eq!(
        err.to_string(),
        "Configuration error: No deviceId and/or accessToken provided for VoodooSpark adaptor. Cannot proceed"
    );
}

#[test]
fn test_constructor_without_access_token() {
    let config = AdaptorConfig::from_params(&serde_json::json!({ "deviceId": "" })).unwrap();
    assert!(matches!(
        VoodooSpark::new(config, factory()),
        Err(AdaptorError::Configuration(_))
    ));
}

#[test]
fn test_constructor_without_anything() {
    assert!(matches!(
        VoodooSpark::new(AdaptorConfig::default(), factory()),
        Err(AdaptorError::Configuration(_))
    ));
}

#[test]
fn test_constructor_with_empty_strings() {
    assert!(VoodooSpark::new(AdaptorConfig::new("", "accessToken"), factory()).is_err());
    assert!(VoodooSpark::new(AdaptorConfig::new("deviceId", ""), factory()).is_err());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_connect_creates_one_client() {
    let (spark, _, factory) = setup();
    spark.connect().await.unwrap();

    assert_eq!(factory.created(), 1);
    assert!(spark.is_connected());
    assert_eq!(spark.connection_status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_connect_publishes_ready() {
    let (spark, _, _) = setup();
    let mut rx = spark.event_bus().lifecycle_events();

    spark.connect().await.unwrap();

    let (event, meta) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, AdaptorEvent::Ready { ref device_id, .. } if device_id == "deviceId"));
    assert_eq!(meta.source, "adaptor:deviceId");
}

#[tokio::test]
async fn test_connect_failure_is_connection_error() {
    let (spark, client, _) = setup();
    client.fail_ready(true);

    let err = spark.connect().await.unwrap_err();
    assert!(matches!(err, AdaptorError::Connection(_)));
    assert!(matches!(
        spark.digital_read(1).await,
        Err(AdaptorError::NotConnected)
    ));
}

#[tokio::test]
async fn test_disconnect_when_never_connected() {
    let (spark, client, _) = setup();
    spark.disconnect().await.unwrap();
    assert!(client.calls().is_empty());
    assert_eq!(spark.connection_status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_disconnect_closes_client() {
    let (spark, client) = connected().await;
    let mut rx = spark.subscribe();

    spark.disconnect().await.unwrap();

    assert!(client.is_closed());
    assert!(!spark.is_connected());
    let (event, _) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.type_name(), "Disconnected");
}

#[tokio::test]
async fn test_second_connect_replaces_handle() {
    let (spark, client, factory) = setup();
    spark.connect().await.unwrap();
    spark.connect().await.unwrap();

    assert_eq!(factory.created(), 2);
    assert!(client.calls().contains(&ClientCall::Close));
    assert!(spark.is_connected());
}

#[test]
fn test_commands() {
    let (spark, _, _) = setup();
    let names: Vec<&str> = spark.commands().iter().map(|c| c.as_str()).collect();
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
    let unique: std::collections::HashSet<_> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
}

// ============================================================================
// Pin operations
// ============================================================================

#[tokio::test]
async fn test_operations_before_connect_fail() {
    let (spark, client, _) = setup();

    assert!(matches!(spark.digital_read(1).await, Err(AdaptorError::NotConnected)));
    assert!(matches!(spark.digital_write(1, 1).await, Err(AdaptorError::NotConnected)));
    assert!(matches!(spark.analog_read(1).await, Err(AdaptorError::NotConnected)));
    assert!(matches!(spark.pwm_write(1, 1.0).await, Err(AdaptorError::NotConnected)));
    assert!(matches!(spark.servo_write(1, 1.0).await, Err(AdaptorError::NotConnected)));
    assert!(matches!(
        spark.listen_for_events(["testevent"]).await,
        Err(AdaptorError::NotConnected)
    ));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_digital_read() {
    let (spark, client) = connected().await;
    client.set_pin_value(1, 1);

    let value = spark.digital_read(1).await.unwrap();

    assert_eq!(value, 1);
    assert_eq!(
        client.calls(),
        vec![
            ClientCall::SetPinMode { pin: 1, mode: PinMode::Input },
            ClientCall::DigitalRead { pin: 1 },
        ]
    );
}

#[tokio::test]
async fn test_digital_write_unscaled() {
    let (spark, client) = connected().await;

    spark.digital_write(1, 1).await.unwrap();

    assert_eq!(
        client.calls(),
        vec![
            ClientCall::SetPinMode { pin: 1, mode: PinMode::Output },
            ClientCall::DigitalWrite { pin: 1, value: 1 },
        ]
    );
}

#[tokio::test]
async fn test_analog_read() {
    let (spark, client) = connected().await;
    client.set_pin_value(1, 2048);

    assert_eq!(spark.analog_read(1).await.unwrap(), 2048);
    assert_eq!(
        client.calls(),
        vec![
            ClientCall::SetPinMode { pin: 1, mode: PinMode::Analog },
            ClientCall::AnalogRead { pin: 1 },
        ]
    );
}

#[tokio::test]
async fn test_pwm_write_scales_to_255() {
    let (spark, client) = connected().await;

    spark.pwm_write(1, 1.0).await.unwrap();

    assert_eq!(
        client.calls(),
        vec![
            ClientCall::SetPinMode { pin: 1, mode: PinMode::Pwm },
            ClientCall::AnalogWrite { pin: 1, value: 255 },
        ]
    );
}

#[tokio::test]
async fn test_analog_write_matches_pwm_write() {
    let (spark, client) = connected().await;

    spark.analog_write(1, 1.0).await.unwrap();

    assert_eq!(
        client.calls(),
        vec![
            ClientCall::SetPinMode { pin: 1, mode: PinMode::Pwm },
            ClientCall::AnalogWrite { pin: 1, value: 255 },
        ]
    );
}

#[tokio::test]
async fn test_servo_write_scales_to_180() {
    let (spark, client) = connected().await;

    spark.servo_write(1, 1.0).await.unwrap();

    assert_eq!(
        client.calls(),
        vec![
            ClientCall::SetPinMode { pin: 1, mode: PinMode::Servo },
            ClientCall::ServoWrite { pin: 1, value: 180 },
        ]
    );
}

#[tokio::test]
async fn test_zero_level_writes_zero() {
    let (spark, client) = connected().await;

    spark.pwm_write(2, 0.0).await.unwrap();
    spark.servo_write(3, 0.0).await.unwrap();

    assert_eq!(
        client.io_calls(),
        vec![
            ClientCall::AnalogWrite { pin: 2, value: 0 },
            ClientCall::ServoWrite { pin: 3, value: 0 },
        ]
    );
}

#[tokio::test]
async fn test_pin_val() {
    let (spark, _, _) = setup();
    assert_eq!(spark.pin_val(1), "HIGH");
    assert_eq!(spark.pin_val(0), "LOW");
}

// ============================================================================
// Mode tracking
// ============================================================================

#[tokio::test]
async fn test_repeated_operation_sets_mode_once() {
    let (spark, client) = connected().await;

    spark.digital_read(1).await.unwrap();
    spark.digital_read(1).await.unwrap();

    assert_eq!(client.mode_sets(), vec![(1, PinMode::Input)]);
    assert_eq!(client.io_calls().len(), 2);
}

#[tokio::test]
async fn test_repeated_writes_set_mode_once() {
    let (spark, client) = connected().await;

    spark.servo_write(5, 0.5).await.unwrap();
    spark.servo_write(5, 1.0).await.unwrap();

    assert_eq!(client.mode_sets(), vec![(5, PinMode::Servo)]);
    assert_eq!(
        client.io_calls(),
        vec![
            ClientCall::ServoWrite { pin: 5, value: 90 },
            ClientCall::ServoWrite { pin: 5, value: 180 },
        ]
    );
}

#[tokio::test]
async fn test_mode_change_reissues_mode_set() {
    let (spark, client) = connected().await;

    spark.digital_write(1, 1).await.unwrap();
    spark.digital_read(1).await.unwrap();
    spark.digital_write(1, 0).await.unwrap();

    assert_eq!(
        client.mode_sets(),
        vec![(1, PinMode::Output), (1, PinMode::Input), (1, PinMode::Output)]
    );
    assert_eq!(spark.pin_mode(1).await, Some(PinMode::Output));
}

#[tokio::test]
async fn test_pwm_and_analog_write_share_mode() {
    let (spark, client) = connected().await;

    spark.pwm_write(1, 1.0).await.unwrap();
    spark.analog_write(1, 0.0).await.unwrap();

    assert_eq!(client.mode_sets(), vec![(1, PinMode::Pwm)]);
}

#[tokio::test]
async fn test_disconnect_forgets_modes() {
    let (spark, client) = connected().await;

    spark.digital_read(1).await.unwrap();
    spark.disconnect().await.unwrap();
    spark.connect().await.unwrap();
    spark.digital_read(1).await.unwrap();

    assert_eq!(client.mode_sets(), vec![(1, PinMode::Input), (1, PinMode::Input)]);
}

#[tokio::test]
async fn test_concurrent_operations_keep_mode_invariant() {
    let (spark, client) = connected().await;
    let spark = Arc::new(spark);

    let mut handles = Vec::new();
    for i in 0..20 {
        let spark = spark.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                spark.digital_write(1, 1).await.map(|_| ())
            } else {
                spark.digital_read(1).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Every I/O call must directly follow a mode-set for its mode or another
    // I/O call of the same kind.
    let mut current = None;
    for call in client.calls() {
        match call {
            ClientCall::SetPinMode { mode, .. } => current = Some(mode),
            ClientCall::DigitalWrite { .. } => assert_eq!(current, Some(PinMode::Output)),
            ClientCall::DigitalRead { .. } => assert_eq!(current, Some(PinMode::Input)),
            other => panic!("unexpected call {:?}", other),
        }
    }
    assert_eq!(client.io_calls().len(), 20);
}

// ============================================================================
// Error propagation
// ============================================================================

#[tokio::test]
async fn test_failed_read_keeps_recorded_mode() {
    let (spark, client) = connected().await;
    client.fail_io(true);

    let err = spark.analog_read(4).await.unwrap_err();
    assert!(matches!(err, AdaptorError::Operation(_)));
    assert_eq!(spark.pin_mode(4).await, Some(PinMode::Analog));

    client.fail_io(false);
    spark.analog_read(4).await.unwrap();
    assert_eq!(client.mode_sets(), vec![(4, PinMode::Analog)]);
}

#[tokio::test]
async fn test_failed_mode_set_skips_operation() {
    let (spark, client) = connected().await;
    client.fail_mode_sets(true);

    assert!(matches!(
        spark.digital_write(2, 1).await,
        Err(AdaptorError::Operation(_))
    ));
    assert!(client.io_calls().is_empty());
    assert_eq!(spark.pin_mode(2).await, None);
}

#[tokio::test]
async fn test_invalid_level_rejected() {
    let (spark, client) = connected().await;

    assert!(matches!(
        spark.pwm_write(1, 2.0).await,
        Err(AdaptorError::InvalidValue(_))
    ));
    assert!(matches!(
        spark.servo_write(1, -1.0).await,
        Err(AdaptorError::InvalidValue(_))
    ));
    assert!(client.calls().is_empty());
}

// ============================================================================
// Cloud functions and variables
// ============================================================================

#[tokio::test]
async fn test_call_function() {
    let (spark, client) = connected().await;
    client.register_function("fortyTwo", 42);

    assert_eq!(spark.call_function("fortyTwo", &[]).await.unwrap(), 42);
    assert_eq!(spark.call_function("fortyTwo", &["a", "b"]).await.unwrap(), 42);
    assert!(client.calls().contains(&ClientCall::CallFunction {
        name: "fortyTwo".to_string(),
        args: "a,b".to_string()
    }));
}

#[tokio::test]
async fn test_variable() {
    let (spark, client) = connected().await;
    client.set_variable("temperature", serde_json::json!(21.5));

    assert_eq!(
        spark.variable("temperature").await.unwrap(),
        serde_json::json!(21.5)
    );
    assert!(spark.variable("missing").await.is_err());
}
