//! Configuration model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use ticketry_core::{CascadeMode, Error, Result, TicketKind};

/// Whole deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketryConfig {
    /// How descendants follow their parent's expiry and deletion
    pub cascade_mode: CascadeMode,
    /// Node identifier appended to every generated id
    pub id_suffix: Option<String>,
    /// Per-kind overrides of the catalog defaults
    pub tickets: BTreeMap<TicketKind, KindSettings>,
    pub cipher: CipherSettings,
    pub registry: RegistrySettings,
    pub cleaner: CleanerSettings,
}

/// Overrides for one ticket kind. Unset fields keep the kind's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KindSettings {
    pub prefix: Option<String>,
    pub time_to_live_seconds: Option<u64>,
    pub time_to_idle_seconds: Option<u64>,
    pub max_uses: Option<u64>,
    pub storage_name: Option<String>,
    pub storage_timeout_seconds: Option<u64>,
    pub id_length: Option<usize>,
}

impl KindSettings {
    /// Whether any of the lifetime fields is set
    pub fn overrides_policy(&self) -> bool {
        self.time_to_live_seconds.is_some()
            || self.time_to_idle_seconds.is_some()
            || self.max_uses.is_some()
    }
}

/// At-rest protection of stored tickets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherSettings {
    pub enabled: bool,
    /// Base64url AES-128 key
    pub encryption_key: Option<String>,
    /// Base64url HMAC-SHA-256 key
    pub signing_key: Option<String>,
    /// Store tickets under the SHA-512 digest of their id
    pub encode_ids: bool,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Memory,
    Moka,
    Document,
    Sql,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Moka => "moka",
            Self::Document => "document",
            Self::Sql => "sql",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "moka" => Ok(Self::Moka),
            "document" | "couchdb" => Ok(Self::Document),
            "sql" | "sqlite" => Ok(Self::Sql),
            other => Err(Error::configuration(format!(
                "unknown registry backend '{other}', expected memory, moka, document or sql"
            ))),
        }
    }
}

/// Registry and storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub backend: BackendKind,
    /// Server URL (document) or connection string (sql)
    pub url: Option<String>,
    /// Prepended to every region name to form database names
    pub database_prefix: String,
    /// Upper bound for a single registry operation
    pub operation_timeout_ms: Option<u64>,
    /// Retries after an optimistic-concurrency conflict
    pub conflict_retries: usize,
    /// Pause between conflict retries
    pub conflict_retry_delay_ms: u64,
    /// Username for the document store
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            url: None,
            database_prefix: "ticketry_".to_string(),
            operation_timeout_ms: None,
            conflict_retries: 3,
            conflict_retry_delay_ms: 5,
            username: None,
            password: None,
        }
    }
}

impl RegistrySettings {
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    pub fn conflict_retry_delay(&self) -> Duration {
        Duration::from_millis(self.conflict_retry_delay_ms)
    }
}

/// Background cleaner schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerSettings {
    pub enabled: bool,
    /// Zero disables the schedule
    pub interval_seconds: u64,
    pub startup_delay_seconds: u64,
    /// Leave expiry to backends that evict on their own
    pub delegate_to_native_expiry: bool,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 120,
            startup_delay_seconds: 15,
            delegate_to_native_expiry: false,
        }
    }
}

impl CleanerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_seconds)
    }
}

impl TicketryConfig {
    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> Result<()> {
        if self.cipher.encryption_key.is_some() != self.cipher.signing_key.is_some() {
            return Err(Error::configuration(
                "cipher.encryption_key and cipher.signing_key must be set together",
            ));
        }
        if self.cipher.encode_ids && !self.cipher.enabled {
            return Err(Error::configuration(
                "cipher.encode_ids requires cipher.enabled",
            ));
        }

        match self.registry.backend {
            BackendKind::Document => {
                let raw = self.registry.url.as_deref().ok_or_else(|| {
                    Error::configuration("registry.url is required for the document backend")
                })?;
                let parsed = url::Url::parse(raw).map_err(|e| {
                    Error::configuration(format!("registry.url '{raw}' is not a valid URL: {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(Error::configuration(format!(
                        "registry.url must use http or https, got '{}'",
                        parsed.scheme()
                    )));
                }
            }
            BackendKind::Sql => {
                if let Some(raw) = self.registry.url.as_deref() {
                    if !raw.starts_with("sqlite:") {
                        return Err(Error::configuration(format!(
                            "registry.url '{raw}' must be a sqlite: connection string"
                        )));
                    }
                }
            }
            BackendKind::Memory | BackendKind::Moka => {}
        }

        if self.registry.operation_timeout_ms == Some(0) {
            return Err(Error::configuration(
                "registry.operation_timeout_ms must be greater than zero when set",
            ));
        }

        let prefix_ok = self
            .registry
            .database_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !prefix_ok {
            return Err(Error::configuration(format!(
                "registry.database_prefix '{}' may only contain [a-z0-9_]",
                self.registry.database_prefix
            )));
        }

        for (kind, settings) in &self.tickets {
            if settings.max_uses == Some(0) {
                return Err(Error::configuration(format!(
                    "tickets.{kind}.max_uses must be at least 1"
                )));
            }
            if settings.max_uses.is_some() && settings.time_to_idle_seconds.is_some() {
                return Err(Error::configuration(format!(
                    "tickets.{kind}.max_uses cannot be combined with time_to_idle_seconds"
                )));
            }
        }

        Ok(())
    }
}
