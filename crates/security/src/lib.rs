//! At-rest protection for ticket payloads
//!
//! This crate provides:
//! - The `CipherExecutor` contract shared by every payload cipher
//! - A no-op executor for deployments with encryption switched off
//! - AES-128-CBC encrypt-then-sign with HMAC-SHA-256
//! - A base64 string adapter and key material helpers

pub mod aes_hmac;
pub mod cipher;
pub mod encoding;
pub mod keys;
pub mod noop;

pub use aes_hmac::AesHmacCipherExecutor;
pub use cipher::{digest_ticket_id, CipherExecutor, MapCipherExt};
pub use encoding::Base64CipherExecutor;
pub use keys::KeyMaterial;
pub use noop::NoOpCipherExecutor;
