//! AES-128-CBC encrypt-then-sign with HMAC-SHA-256.
//!
//! Payload layout: `version(1) || iv(16) || ciphertext || tag(32)`, where the
//! tag covers everything before it. The tag is checked in constant time
//! before any decryption happens.

use crate::cipher::CipherExecutor;
use crate::keys::KeyMaterial;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use ticketry_core::{Error, Result};

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Current payload format
const FORMAT_VERSION: u8 = 1;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// Version byte, IV, one cipher block and the tag
const MIN_PAYLOAD_LEN: usize = 1 + IV_LEN + BLOCK_LEN + TAG_LEN;

/// Byte cipher protecting serialized tickets
#[derive(Debug, Clone)]
pub struct AesHmacCipherExecutor {
    keys: KeyMaterial,
}

impl AesHmacCipherExecutor {
    pub fn new(keys: KeyMaterial) -> Self {
        Self { keys }
    }

    /// Build from base64url keys, generating throwaway keys if none are set
    pub fn from_config(encryption_key: Option<&str>, signing_key: Option<&str>) -> Result<Self> {
        KeyMaterial::resolve(encryption_key, signing_key).map(Self::new)
    }

    fn sign(&self, signed: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.keys.signing_key())
            .map_err(|e| Error::configuration(format!("invalid signing key: {e}")))?;
        mac.update(signed);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl CipherExecutor<Vec<u8>, Vec<u8>> for AesHmacCipherExecutor {
    fn encode(&self, plaintext: &Vec<u8>) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes128CbcEnc::new_from_slices(self.keys.encryption_key(), &iv)
            .map_err(|e| Error::encode(format!("invalid encryption key: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut payload = Vec::with_capacity(1 + IV_LEN + ciphertext.len() + TAG_LEN);
        payload.push(FORMAT_VERSION);
        payload.extend_from_slice(&iv);
        payload.extend_from_slice(&ciphertext);
        let tag = self.sign(&payload)?;
        payload.extend_from_slice(&tag);
        Ok(payload)
    }

    fn decode(&self, payload: &Vec<u8>) -> Result<Vec<u8>> {
        if payload.len() < MIN_PAYLOAD_LEN {
            return Err(Error::decode(format!(
                "payload of {} bytes is shorter than the minimum of {MIN_PAYLOAD_LEN}",
                payload.len()
            )));
        }
        if payload[0] != FORMAT_VERSION {
            return Err(Error::decode(format!(
                "unsupported payload version {}",
                payload[0]
            )));
        }

        let (signed, tag) = payload.split_at(payload.len() - TAG_LEN);
        let expected = self.sign(signed)?;
        if !bool::from(expected.as_slice().ct_eq(tag)) {
            return Err(Error::decode("signature verification failed"));
        }

        let (iv, ciphertext) = signed[1..].split_at(IV_LEN);
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(Error::decode("ciphertext is not a whole number of blocks"));
        }
        Aes128CbcDec::new_from_slices(self.keys.encryption_key(), iv)
            .map_err(|e| Error::decode(format!("invalid encryption key: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::decode("invalid padding"))
    }

    fn name(&self) -> &'static str {
        "aes128-cbc-hmac-sha256"
    }
}
