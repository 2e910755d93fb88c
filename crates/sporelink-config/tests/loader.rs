//! File, `.env` and environment layering.

use std::io::Write;

use sporelink_config::{ConfigError, ConfigLoader};
use sporelink_telemetry::LogFormat;
use sporelink_ws::Role;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn toml_file_overrides_defaults() {
    let file = write_temp(
        ".toml",
        r#"
            [websocket]
            read_chunk_size = 2048
            debug = true

            [logging]
            format = "pretty"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.websocket.read_chunk_size, 2048);
    assert!(config.websocket.debug);
    assert_eq!(config.websocket.poll_interval_ms, 10);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn json_file_is_supported() {
    let file = write_temp(".json", r#"{"websocket": {"role": "server"}}"#);
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.websocket.role, Role::Server);
}

#[test]
fn unknown_extension_is_rejected() {
    let file = write_temp(".yaml", "websocket: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn unknown_field_in_file_is_rejected() {
    let file = write_temp(".toml", "[websocket]\ndeflate = true\n");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn optional_file_is_loaded_when_present() {
    let file = write_temp(".toml", "[websocket]\npoll_interval_ms = 50\n");
    let config = ConfigLoader::new()
        .with_optional_file(file.path())
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.websocket.poll_interval_ms, 50);
}

#[test]
fn env_overrides_file() {
    let file = write_temp(".toml", "[websocket]\nread_chunk_size = 2048\n");
    std::env::set_var("SPTEST_ENV__WEBSOCKET__READ_CHUNK_SIZE", "512");
    std::env::set_var("SPTEST_ENV__LOGGING__SERVICE_NAME", "greenhouse");

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("sptest_env")
        .load()
        .unwrap();

    assert_eq!(config.websocket.read_chunk_size, 512);
    assert_eq!(config.logging.service_name, "greenhouse");
}

#[test]
fn env_prefix_does_not_match_longer_prefixes() {
    std::env::set_var("SPTEST_PFXLONG__WEBSOCKET__DEBUG", "not-a-bool");

    let config = ConfigLoader::new().with_env_prefix("SPTEST_PFX").load().unwrap();
    assert!(!config.websocket.debug);
}

#[test]
fn invalid_env_value_fails_load() {
    std::env::set_var("SPTEST_BAD__WEBSOCKET__POLL_INTERVAL_MS", "soon");

    let result = ConfigLoader::new().with_env_prefix("SPTEST_BAD").load();
    assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
}

#[test]
fn dotenv_file_feeds_env_overrides() {
    let file = write_temp(
        ".env",
        "SPTEST_DOTENV__WEBSOCKET__DEBUG=true\nSPTEST_DOTENV__WEBSOCKET__MAX_FRAME_SIZE=none\n",
    );

    let config = ConfigLoader::new()
        .with_dotenv_file(file.path())
        .unwrap()
        .with_env_prefix("SPTEST_DOTENV")
        .load()
        .unwrap();

    assert!(config.websocket.debug);
    assert_eq!(config.websocket.max_frame_size, None);
}

#[test]
fn missing_dotenv_file_is_an_error() {
    let result = ConfigLoader::new().with_dotenv_file("/nonexistent/.env");
    assert!(matches!(result, Err(ConfigError::DotenvError(_))));
}
