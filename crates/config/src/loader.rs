//! Layered configuration loading

use crate::settings::{BackendKind, TicketryConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use ticketry_core::{CascadeMode, Error, Result};
use ticketry_utils::xdg::XdgPaths;

/// Prefix of every environment variable the loader reads
pub const ENV_PREFIX: &str = "TICKETRY_";

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
    /// Command line argument
    CommandLine,
}

/// Values given on the command line; they win over every other layer
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend: Option<BackendKind>,
    pub url: Option<String>,
    pub cascade_mode: Option<CascadeMode>,
}

impl CliOverrides {
    fn is_empty(&self) -> bool {
        self.backend.is_none() && self.url.is_none() && self.cascade_mode.is_none()
    }
}

/// A configuration together with the layers it was assembled from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TicketryConfig,
    pub sources: Vec<ConfigSource>,
}

/// Configuration loader that handles precedence
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default file location, the environment and `overrides`
    pub fn load(overrides: &CliOverrides) -> Result<LoadedConfig> {
        Self::load_from(None, overrides)
    }

    /// Load with full precedence handling: defaults, then the JSON file at
    /// `path` (or the XDG default), then `TICKETRY_*` variables, then
    /// `overrides`. An explicit `path` must exist.
    pub fn load_from(path: Option<&Path>, overrides: &CliOverrides) -> Result<LoadedConfig> {
        let mut merged = serde_json::to_value(TicketryConfig::default())
            .map_err(|e| Error::serialization("defaults", e))?;
        let mut sources = vec![ConfigSource::Default];

        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::configuration(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Some(XdgPaths::config_file()).filter(|path| path.exists()),
        };

        if let Some(config_path) = config_path {
            let file_value = Self::read_config_file(&config_path)?;
            merge_json(&mut merged, file_value);
            tracing::debug!(path = %config_path.display(), "loaded config file");
            sources.push(ConfigSource::ConfigFile(config_path));
        }

        let mut config: TicketryConfig = serde_json::from_value(merged)
            .map_err(|e| Error::configuration(format!("invalid configuration: {e}")))?;

        for variable in Self::apply_env(&mut config)? {
            sources.push(ConfigSource::EnvironmentVariable(variable));
        }

        if !overrides.is_empty() {
            Self::apply_overrides(&mut config, overrides);
            sources.push(ConfigSource::CommandLine);
        }

        config.validate()?;
        Ok(LoadedConfig { config, sources })
    }

    fn read_config_file(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("config file {} is not valid JSON: {e}", path.display()))
        })?;
        if !value.is_object() {
            return Err(Error::configuration(format!(
                "config file {} must contain a JSON object",
                path.display()
            )));
        }
        Ok(value)
    }

    /// Apply `TICKETRY_*` variables, returning the names that were set
    fn apply_env(config: &mut TicketryConfig) -> Result<Vec<String>> {
        let mut applied = Vec::new();
        let mut read = |suffix: &str| -> Option<String> {
            let name = format!("{ENV_PREFIX}{suffix}");
            let value = std::env::var(&name).ok()?;
            applied.push(name);
            Some(value)
        };

        if let Some(value) = read("CASCADE_MODE") {
            config.cascade_mode = value.parse()?;
        }
        if let Some(value) = read("ID_SUFFIX") {
            config.id_suffix = Some(value);
        }
        if let Some(value) = read("BACKEND") {
            config.registry.backend = value.parse()?;
        }
        if let Some(value) = read("REGISTRY_URL") {
            config.registry.url = Some(value);
        }
        if let Some(value) = read("DATABASE_PREFIX") {
            config.registry.database_prefix = value;
        }
        if let Some(value) = read("OPERATION_TIMEOUT_MS") {
            config.registry.operation_timeout_ms = Some(parse_number("OPERATION_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = read("CONFLICT_RETRIES") {
            config.registry.conflict_retries = parse_number("CONFLICT_RETRIES", &value)?;
        }
        if let Some(value) = read("CIPHER_ENABLED") {
            config.cipher.enabled = parse_bool("CIPHER_ENABLED", &value)?;
        }
        if let Some(value) = read("ENCRYPTION_KEY") {
            config.cipher.encryption_key = Some(value);
        }
        if let Some(value) = read("SIGNING_KEY") {
            config.cipher.signing_key = Some(value);
        }
        if let Some(value) = read("ENCODE_IDS") {
            config.cipher.encode_ids = parse_bool("ENCODE_IDS", &value)?;
        }
        if let Some(value) = read("CLEANER_ENABLED") {
            config.cleaner.enabled = parse_bool("CLEANER_ENABLED", &value)?;
        }
        if let Some(value) = read("CLEANER_INTERVAL_SECONDS") {
            config.cleaner.interval_seconds = parse_number("CLEANER_INTERVAL_SECONDS", &value)?;
        }

        Ok(applied)
    }

    fn apply_overrides(config: &mut TicketryConfig, overrides: &CliOverrides) {
        if let Some(backend) = overrides.backend {
            config.registry.backend = backend;
        }
        if let Some(url) = &overrides.url {
            config.registry.url = Some(url.clone());
        }
        if let Some(cascade_mode) = overrides.cascade_mode {
            config.cascade_mode = cascade_mode;
        }
    }
}

/// Deep merge of JSON objects; anything else in `overlay` replaces `base`
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_number<T: std::str::FromStr>(suffix: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::configuration(format!("{ENV_PREFIX}{suffix}='{value}' is not a valid number"))
    })
}

fn parse_bool(suffix: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{ENV_PREFIX}{suffix}='{value}' is not a boolean"
        ))),
    }
}
