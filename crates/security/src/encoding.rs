use crate::cipher::CipherExecutor;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::sync::Arc;
use ticketry_core::{Error, Result};

/// String cipher over a byte cipher, rendering payloads as unpadded base64url.
///
/// Suitable for short tokens that travel in URLs or form fields.
#[derive(Clone)]
pub struct Base64CipherExecutor {
    inner: Arc<dyn CipherExecutor<Vec<u8>, Vec<u8>>>,
}

impl Base64CipherExecutor {
    pub fn new(inner: Arc<dyn CipherExecutor<Vec<u8>, Vec<u8>>>) -> Self {
        Self { inner }
    }
}

impl CipherExecutor<String, String> for Base64CipherExecutor {
    fn encode(&self, value: &String) -> Result<String> {
        let payload = self.inner.encode(&value.as_bytes().to_vec())?;
        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    fn decode(&self, value: &String) -> Result<String> {
        let payload = URL_SAFE_NO_PAD
            .decode(value.as_bytes())
            .map_err(|e| Error::decode(format!("invalid base64url payload: {e}")))?;
        let plaintext = self.inner.decode(&payload)?;
        String::from_utf8(plaintext)
            .map_err(|e| Error::decode(format!("decoded payload is not UTF-8: {e}")))
    }

    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    fn name(&self) -> &'static str {
        "base64"
    }
}
