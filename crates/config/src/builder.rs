//! Programmatic configuration

use crate::settings::{BackendKind, KindSettings, TicketryConfig};
use ticketry_core::{CascadeMode, Result, TicketKind};

/// Builder for creating configurations in code and tests
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: TicketryConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cascade_mode(mut self, cascade_mode: CascadeMode) -> Self {
        self.config.cascade_mode = cascade_mode;
        self
    }

    pub fn with_id_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.id_suffix = Some(suffix.into());
        self
    }

    pub fn with_kind(mut self, kind: TicketKind, settings: KindSettings) -> Self {
        self.config.tickets.insert(kind, settings);
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.config.registry.backend = backend;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.config.registry.url = Some(url.into());
        self
    }

    pub fn with_operation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.registry.operation_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_conflict_retries(mut self, retries: usize) -> Self {
        self.config.registry.conflict_retries = retries;
        self
    }

    /// Turn encryption on with the given base64url keys
    pub fn with_cipher_keys(
        mut self,
        encryption_key: impl Into<String>,
        signing_key: impl Into<String>,
    ) -> Self {
        self.config.cipher.enabled = true;
        self.config.cipher.encryption_key = Some(encryption_key.into());
        self.config.cipher.signing_key = Some(signing_key.into());
        self
    }

    pub fn with_cipher_enabled(mut self, enabled: bool) -> Self {
        self.config.cipher.enabled = enabled;
        self
    }

    pub fn with_encoded_ids(mut self, encode_ids: bool) -> Self {
        self.config.cipher.encode_ids = encode_ids;
        self
    }

    pub fn with_cleaner_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.cleaner.interval_seconds = seconds;
        self
    }

    pub fn with_cleaner_enabled(mut self, enabled: bool) -> Self {
        self.config.cleaner.enabled = enabled;
        self
    }

    pub fn with_native_expiry_delegation(mut self, delegate: bool) -> Self {
        self.config.cleaner.delegate_to_native_expiry = delegate;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<TicketryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
