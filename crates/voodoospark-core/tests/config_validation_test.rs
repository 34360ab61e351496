//! Configuration validation tests.
//!
//! Covers credential validation, host params parsing and URL normalization.

use voodoospark_core::config::{defaults, endpoints, env_vars, normalize_api_url};
use voodoospark_core::{AdaptorConfig, AdaptorError, Credentials};

#[test]
fn test_credentials_rejects_each_missing_field() {
    let cases = [("", "accessToken"), ("deviceId", ""), ("", "")];
    for (device_id, token) in cases {
        let err = Credentials::new(device_id, token).unwrap_err();
        assert!(
            matches!(err, AdaptorError::Configuration(_)),
            "({:?}, {:?}) should be rejected",
            device_id,
            token
        );
    }
}

#[test]
fn test_credentials_stored_unchanged() {
    let creds = Credentials::new("deviceId", "accessToken").unwrap();
    assert_eq!(creds.device_id(), "deviceId");
    assert_eq!(creds.access_token(), "accessToken");
}

#[test]
fn test_config_only_token() {
    let config = AdaptorConfig::from_params(&serde_json::json!({ "accessToken": "" })).unwrap();
    assert!(config.credentials().unwrap_err().is_configuration());

    let config = AdaptorConfig::from_params(&serde_json::json!({ "deviceId": "" })).unwrap();
    assert!(config.credentials().unwrap_err().is_configuration());
}

#[test]
fn test_config_rejects_malformed_params() {
    let err = AdaptorConfig::from_params(&serde_json::json!({ "readInterval": "soon" }))
        .unwrap_err();
    assert!(err.to_string().contains("Invalid adaptor params"));
}

#[test]
fn test_config_builder() {
    let config = AdaptorConfig::new("dev", "tok")
        .with_read_interval(250)
        .with_api_base_url("http://127.0.0.1:9000/v1/")
        .with_request_timeout(3);

    assert_eq!(config.read_interval().as_millis(), 250);
    assert_eq!(config.api_base_url, "http://127.0.0.1:9000");
    assert_eq!(config.request_timeout().as_secs(), 3);
}

#[test]
fn test_config_defaults() {
    let config = AdaptorConfig::default();
    assert_eq!(config.read_interval_ms, defaults::READ_INTERVAL_MS);
    assert_eq!(config.request_timeout_secs, defaults::REQUEST_TIMEOUT_SECS);
    assert_eq!(config.api_base_url, endpoints::PARTICLE_CLOUD);
}

#[test]
fn test_normalize_api_url_edge_cases() {
    assert_eq!(normalize_api_url("".to_string()), "");
    assert_eq!(
        normalize_api_url("https://relay.example.com/v1//".to_string()),
        "https://relay.example.com"
    );
    assert_eq!(
        normalize_api_url("https://relay.example.com/v1/api".to_string()),
        "https://relay.example.com/v1/api"
    );
}

#[test]
fn test_env_var_constants_unique() {
    let vars = [
        env_vars::DEVICE_ID,
        env_vars::ACCESS_TOKEN,
        env_vars::API_URL,
        env_vars::READ_INTERVAL_MS,
        env_vars::REQUEST_TIMEOUT_SECS,
    ];

    let unique: std::collections::HashSet<_> = vars.iter().collect();
    assert_eq!(unique.len(), vars.len(), "Environment variable names should be unique");
}
