use std::time::Duration;

/// Result type alias for ticketry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by the catalog, factories, ciphers and registries.
///
/// There is no not-found variant; lookups return `Ok(None)` or `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing factory, missing catalog entry, bad key material or settings
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A ticket exists but cannot be used for the requested operation
    #[error("ticket '{ticket_id}' is invalid: {reason}")]
    InvalidTicket { ticket_id: String, reason: String },

    /// Optimistic-concurrency write collision reported by a storage adapter
    #[error("write conflict on '{key}' during {operation}")]
    Conflict {
        key: String,
        operation: &'static str,
    },

    /// Conflict retries were used up without a successful write
    #[error("gave up on '{key}' during {operation} after {attempts} conflicting attempts")]
    RetriesExhausted {
        key: String,
        operation: &'static str,
        attempts: usize,
    },

    /// Storage backend unreachable or returned an unexpected failure
    #[error("{backend} backend failed during {operation}: {message}")]
    Backend {
        backend: String,
        operation: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend or registry-level operation timeout
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Cipher could not verify or decrypt a payload
    #[error("failed to decode protected payload: {reason}")]
    Decode { reason: String },

    /// Cipher could not protect a payload
    #[error("failed to encode payload: {reason}")]
    Encode { reason: String },

    /// JSON (de)serialization of a ticket or stored record failed
    #[error("serialization of '{key}' failed: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Operation is not available on this value without decoding it first
    #[error("unsupported operation '{operation}': {reason}")]
    Unsupported { operation: String, reason: String },
}

/// Coarse classification used by retry logic and callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    InvalidTicket,
    Conflict,
    Exhausted,
    Unavailable,
    Timeout,
    Decode,
    Serialization,
    Unsupported,
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Retry the operation
    Retry,
    /// Treat the ticket as invalid and make the user authenticate again
    Reauthenticate,
    /// Verify connectivity to the storage backend
    CheckBackend { backend: String },
    /// Fix deployment configuration
    UpdateConfiguration,
    /// No automated recovery possible
    NoRecovery,
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid ticket error
    #[must_use]
    pub fn invalid_ticket(ticket_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidTicket {
            ticket_id: ticket_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a conflict error
    #[must_use]
    pub fn conflict(key: impl Into<String>, operation: &'static str) -> Self {
        Error::Conflict {
            key: key.into(),
            operation,
        }
    }

    /// Create a backend error without an underlying source
    #[must_use]
    pub fn backend(
        backend: impl Into<String>,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::Backend {
            backend: backend.into(),
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error wrapping the driver error
    #[must_use]
    pub fn backend_with_source(
        backend: impl Into<String>,
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source = source.into();
        Error::Backend {
            backend: backend.into(),
            operation,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a decode error
    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }

    /// Create an encode error
    #[must_use]
    pub fn encode(reason: impl Into<String>) -> Self {
        Error::Encode {
            reason: reason.into(),
        }
    }

    /// Create a serialization error for the given key
    #[must_use]
    pub fn serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Serialization {
            key: key.into(),
            source,
        }
    }

    /// Create an unsupported operation error
    #[must_use]
    pub fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Unsupported {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::InvalidTicket { .. } => ErrorKind::InvalidTicket,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::RetriesExhausted { .. } => ErrorKind::Exhausted,
            Self::Backend { .. } => ErrorKind::Unavailable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Encode { .. } | Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// Whether this is an optimistic-concurrency conflict
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this error is transient and can be retried by the caller
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::Unavailable | ErrorKind::Timeout
        )
    }

    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::Conflict { .. } | Self::Timeout { .. } => RecoveryHint::Retry,
            Self::InvalidTicket { .. } | Self::Decode { .. } => RecoveryHint::Reauthenticate,
            Self::Backend { backend, .. } => RecoveryHint::CheckBackend {
                backend: backend.clone(),
            },
            Self::Configuration { .. } => RecoveryHint::UpdateConfiguration,
            Self::RetriesExhausted { .. }
            | Self::Encode { .. }
            | Self::Serialization { .. }
            | Self::Unsupported { .. } => RecoveryHint::NoRecovery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::conflict("ST-1", "update").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::backend("sql", "fetch", "connection refused").kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(
            Error::timeout("fetch", Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(Error::decode("bad tag").kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_timeout_is_not_absence() {
        let error = Error::timeout("fetch", Duration::from_millis(250));
        assert!(error.is_transient());
        assert_eq!(error.recovery_hint(), RecoveryHint::Retry);
        assert!(error.to_string().contains("timed out"));
    }

    #[test]
    fn test_decode_failure_means_reauthenticate() {
        let error = Error::decode("signature mismatch");
        assert!(!error.is_transient());
        assert_eq!(error.recovery_hint(), RecoveryHint::Reauthenticate);
    }

    #[test]
    fn test_exhausted_is_not_retried_again() {
        let error = Error::RetriesExhausted {
            key: "TGT-1".to_string(),
            operation: "update",
            attempts: 4,
        };
        assert!(!error.is_conflict());
        assert_eq!(error.kind(), ErrorKind::Exhausted);
        assert!(error.to_string().contains("4 conflicting attempts"));
    }
}
