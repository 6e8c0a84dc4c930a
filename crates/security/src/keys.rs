//! Key material for the AES/HMAC cipher

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use ticketry_core::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-128 key size in bytes
pub const ENCRYPTION_KEY_LEN: usize = 16;

/// Minimum HMAC-SHA-256 signing key size in bytes
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Size of generated signing keys
pub const GENERATED_SIGNING_KEY_LEN: usize = 64;

/// Encryption and signing keys, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    encryption_key: Vec<u8>,
    signing_key: Vec<u8>,
}

impl KeyMaterial {
    pub fn new(encryption_key: Vec<u8>, signing_key: Vec<u8>) -> Result<Self> {
        if encryption_key.len() != ENCRYPTION_KEY_LEN {
            return Err(Error::configuration(format!(
                "encryption key must be {ENCRYPTION_KEY_LEN} bytes, got {}",
                encryption_key.len()
            )));
        }
        if signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(Error::configuration(format!(
                "signing key must be at least {MIN_SIGNING_KEY_LEN} bytes, got {}",
                signing_key.len()
            )));
        }
        Ok(Self {
            encryption_key,
            signing_key,
        })
    }

    /// Parse keys given as base64url strings (padding optional)
    pub fn from_base64(encryption_key: &str, signing_key: &str) -> Result<Self> {
        Self::new(decode_key(encryption_key)?, decode_key(signing_key)?)
    }

    /// Fresh random keys from the OS CSPRNG
    pub fn generate() -> Self {
        let mut encryption_key = vec![0u8; ENCRYPTION_KEY_LEN];
        let mut signing_key = vec![0u8; GENERATED_SIGNING_KEY_LEN];
        OsRng.fill_bytes(&mut encryption_key);
        OsRng.fill_bytes(&mut signing_key);
        Self {
            encryption_key,
            signing_key,
        }
    }

    /// Use configured keys, or generate both when neither is configured.
    ///
    /// Generated keys only live as long as the process, so payloads written
    /// with them cannot be read after a restart or by another node.
    pub fn resolve(encryption_key: Option<&str>, signing_key: Option<&str>) -> Result<Self> {
        match (encryption_key, signing_key) {
            (Some(encryption_key), Some(signing_key)) => {
                Self::from_base64(encryption_key, signing_key)
            }
            (None, None) => {
                tracing::warn!(
                    "no cipher keys configured, generated random keys for this process; \
                     stored tickets will be unreadable after a restart or on other nodes"
                );
                Ok(Self::generate())
            }
            _ => Err(Error::configuration(
                "encryption and signing keys must be configured together",
            )),
        }
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }

    /// Encryption key as base64url, for `keys generate`
    pub fn encryption_key_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.encryption_key)
    }

    /// Signing key as base64url, for `keys generate`
    pub fn signing_key_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.signing_key)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("encryption_key", &"<redacted>")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

fn decode_key(encoded: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(encoded.trim().trim_end_matches('='))
        .map_err(|e| Error::configuration(format!("key is not valid base64url: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_round_trip_through_base64() {
        let keys = KeyMaterial::generate();
        let parsed =
            KeyMaterial::from_base64(&keys.encryption_key_base64(), &keys.signing_key_base64())
                .unwrap();
        assert_eq!(parsed.encryption_key(), keys.encryption_key());
        assert_eq!(parsed.signing_key(), keys.signing_key());
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        let short = URL_SAFE_NO_PAD.encode([0u8; 8]);
        let signing = URL_SAFE_NO_PAD.encode([0u8; 32]);
        assert!(KeyMaterial::from_base64(&short, &signing).is_err());

        let encryption = URL_SAFE_NO_PAD.encode([0u8; 16]);
        let short_signing = URL_SAFE_NO_PAD.encode([0u8; 16]);
        assert!(KeyMaterial::from_base64(&encryption, &short_signing).is_err());
    }

    #[test]
    fn test_accepts_padded_input() {
        let encryption = base64::engine::general_purpose::URL_SAFE.encode([7u8; 16]);
        let signing = base64::engine::general_purpose::URL_SAFE.encode([9u8; 40]);
        let keys = KeyMaterial::from_base64(&encryption, &signing).unwrap();
        assert_eq!(keys.encryption_key(), &[7u8; 16]);
    }

    #[test]
    fn test_resolve_requires_both_or_neither() {
        assert!(KeyMaterial::resolve(Some("abc"), None).is_err());
        let generated = KeyMaterial::resolve(None, None).unwrap();
        assert_eq!(generated.encryption_key().len(), ENCRYPTION_KEY_LEN);
        assert_eq!(generated.signing_key().len(), GENERATED_SIGNING_KEY_LEN);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let rendered = format!("{:?}", KeyMaterial::generate());
        assert!(rendered.contains("redacted"));
    }
}
