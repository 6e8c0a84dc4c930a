//! Unit tests for loading and converting configuration

use crate::{
    BackendKind, CliOverrides, ConfigBuilder, ConfigLoader, ConfigSource, KindSettings,
    TicketryConfig,
};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use ticketry_core::{CascadeMode, ExpirationPolicy, TicketKind};

const ENV_VARS: &[&str] = &[
    "TICKETRY_CASCADE_MODE",
    "TICKETRY_BACKEND",
    "TICKETRY_REGISTRY_URL",
    "TICKETRY_CONFLICT_RETRIES",
    "TICKETRY_CIPHER_ENABLED",
    "TICKETRY_CLEANER_INTERVAL_SECONDS",
];

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_file_layer_overrides_defaults() {
    clear_env();
    let file = config_file(
        r#"{
            "cascade_mode": "sovereign",
            "registry": { "backend": "document", "url": "http://127.0.0.1:5984" },
            "tickets": { "service": { "max_uses": 2, "time_to_live_seconds": 30 } }
        }"#,
    );

    let loaded = ConfigLoader::load_from(Some(file.path()), &CliOverrides::default()).unwrap();
    assert_eq!(loaded.config.cascade_mode, CascadeMode::Sovereign);
    assert_eq!(loaded.config.registry.backend, BackendKind::Document);
    assert_eq!(loaded.config.registry.conflict_retries, 3);
    assert_eq!(
        loaded.sources,
        vec![
            ConfigSource::Default,
            ConfigSource::ConfigFile(file.path().to_path_buf())
        ]
    );
}

#[test]
#[serial]
fn test_env_layer_overrides_file() {
    clear_env();
    let file = config_file(r#"{ "registry": { "conflict_retries": 1 } }"#);
    std::env::set_var("TICKETRY_CONFLICT_RETRIES", "7");
    std::env::set_var("TICKETRY_CASCADE_MODE", "sovereign");

    let loaded = ConfigLoader::load_from(Some(file.path()), &CliOverrides::default());
    clear_env();
    let loaded = loaded.unwrap();

    assert_eq!(loaded.config.registry.conflict_retries, 7);
    assert_eq!(loaded.config.cascade_mode, CascadeMode::Sovereign);
    assert!(loaded.sources.contains(&ConfigSource::EnvironmentVariable(
        "TICKETRY_CONFLICT_RETRIES".to_string()
    )));
}

#[test]
#[serial]
fn test_cli_layer_wins() {
    clear_env();
    std::env::set_var("TICKETRY_BACKEND", "moka");
    let overrides = CliOverrides {
        backend: Some(BackendKind::Sql),
        ..Default::default()
    };

    let file = config_file("{}");
    let loaded = ConfigLoader::load_from(Some(file.path()), &overrides);
    clear_env();
    let loaded = loaded.unwrap();

    assert_eq!(loaded.config.registry.backend, BackendKind::Sql);
    assert_eq!(loaded.sources.last(), Some(&ConfigSource::CommandLine));
}

#[test]
#[serial]
fn test_bad_env_value_is_configuration_error() {
    clear_env();
    std::env::set_var("TICKETRY_CIPHER_ENABLED", "perhaps");
    let file = config_file("{}");
    let result = ConfigLoader::load_from(Some(file.path()), &CliOverrides::default());
    clear_env();

    assert!(matches!(
        result,
        Err(ticketry_core::Error::Configuration { .. })
    ));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env();
    let result = ConfigLoader::load_from(
        Some(std::path::Path::new("/definitely/not/here.json")),
        &CliOverrides::default(),
    );
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let file = config_file("{ not json");
    assert!(ConfigLoader::load_from(Some(file.path()), &CliOverrides::default()).is_err());
}

#[test]
fn test_document_backend_requires_url() {
    let result = ConfigBuilder::new()
        .with_backend(BackendKind::Document)
        .build();
    assert!(result.is_err());

    let result = ConfigBuilder::new()
        .with_backend(BackendKind::Document)
        .with_url("ftp://couch.example.org")
        .build();
    assert!(result.is_err());

    assert!(ConfigBuilder::new()
        .with_backend(BackendKind::Document)
        .with_url("https://couch.example.org:6984")
        .build()
        .is_ok());
}

#[test]
fn test_keys_must_come_in_pairs() {
    let mut config = TicketryConfig::default();
    config.cipher.enabled = true;
    config.cipher.encryption_key = Some("abc".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_encoded_ids_need_cipher() {
    assert!(ConfigBuilder::new().with_encoded_ids(true).build().is_err());
    assert!(ConfigBuilder::new()
        .with_cipher_enabled(true)
        .with_encoded_ids(true)
        .build()
        .is_ok());
}

#[test]
fn test_usage_limit_rejects_idle_timeout() {
    let result = ConfigBuilder::new()
        .with_kind(
            TicketKind::Service,
            KindSettings {
                max_uses: Some(1),
                time_to_idle_seconds: Some(30),
                ..Default::default()
            },
        )
        .build();
    let error = result.unwrap_err();
    assert!(error.to_string().contains("time_to_idle_seconds"));

    assert!(ConfigBuilder::new()
        .with_kind(
            TicketKind::Service,
            KindSettings {
                max_uses: Some(1),
                time_to_live_seconds: Some(30),
                ..Default::default()
            },
        )
        .build()
        .is_ok());
}

#[test]
fn test_default_catalog() {
    let catalog = TicketryConfig::default().catalog().unwrap();
    assert_eq!(catalog.len(), TicketKind::ALL.len());
    assert_eq!(catalog.cascade_mode(), CascadeMode::Dependent);
}

#[test]
fn test_kind_settings_shape_the_catalog() {
    let config = ConfigBuilder::new()
        .with_cascade_mode(CascadeMode::Sovereign)
        .with_kind(
            TicketKind::Service,
            KindSettings {
                prefix: Some("SVC".to_string()),
                max_uses: Some(3),
                time_to_live_seconds: Some(60),
                ..Default::default()
            },
        )
        .with_kind(
            TicketKind::TicketGranting,
            KindSettings {
                time_to_idle_seconds: Some(900),
                storage_name: Some("sessions".to_string()),
                ..Default::default()
            },
        )
        .build()
        .unwrap();

    let catalog = config.catalog().unwrap();
    assert_eq!(catalog.cascade_mode(), CascadeMode::Sovereign);

    let service = catalog.find_by_prefix("SVC").unwrap();
    assert_eq!(service.kind(), TicketKind::Service);
    assert_eq!(
        service.new_expiration_policy(),
        ExpirationPolicy::descendant(ExpirationPolicy::multi_use(3, Duration::from_secs(60)))
    );

    let tgt = catalog.find(TicketKind::TicketGranting).unwrap();
    assert_eq!(tgt.storage_name(), "sessions");
    assert_eq!(
        tgt.new_expiration_policy(),
        ExpirationPolicy::idle_timeout(Duration::from_secs(900))
    );
    assert_eq!(tgt.storage_timeout(), Duration::from_secs(900));
}

#[test]
fn test_config_round_trips_through_json() {
    let config = ConfigBuilder::new()
        .with_backend(BackendKind::Sql)
        .with_kind(
            TicketKind::OAuthRefreshToken,
            KindSettings {
                time_to_live_seconds: Some(86_400),
                ..Default::default()
            },
        )
        .build()
        .unwrap();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: TicketryConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
