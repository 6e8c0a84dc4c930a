//! The cipher contract

use serde_json::Value;
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;
use ticketry_core::Result;

/// Reversible transformation protecting a value before it leaves the process.
///
/// `decode` must fail with `Error::Decode` when a payload cannot be verified
/// or decrypted. It never hands back garbage.
pub trait CipherExecutor<I, O>: Send + Sync {
    fn encode(&self, value: &I) -> Result<O>;

    fn decode(&self, value: &O) -> Result<I>;

    /// Absent in, absent out
    fn encode_optional(&self, value: Option<&I>) -> Result<Option<O>> {
        value.map(|value| self.encode(value)).transpose()
    }

    /// Absent in, absent out
    fn decode_optional(&self, value: Option<&O>) -> Result<Option<I>> {
        value.map(|value| self.decode(value)).transpose()
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// Batch decoding for string ciphers
pub trait MapCipherExt: CipherExecutor<String, String> {
    /// Decode every string value; values of any other JSON type pass through.
    ///
    /// A string that fails to decode fails the whole batch.
    fn decode_map(&self, values: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>> {
        values
            .iter()
            .map(|(name, value)| {
                let decoded = match value {
                    Value::String(encoded) => Value::String(self.decode(encoded)?),
                    other => other.clone(),
                };
                Ok((name.clone(), decoded))
            })
            .collect()
    }
}

impl<T: CipherExecutor<String, String> + ?Sized> MapCipherExt for T {}

/// SHA-512 hex digest used as the storage key when ids are encoded
pub fn digest_ticket_id(ticket_id: &str) -> String {
    hex::encode(Sha512::digest(ticket_id.as_bytes()))
}
