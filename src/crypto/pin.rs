// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PIN-sealed session envelope (record version 2)
//!
//! **Format** (all binary fields base64, standard alphabet):
//! ```text
//! { "encrypted": AES-256-GCM(ciphertext+tag), "salt": 16 bytes, "iv": 12 bytes,
//!   "expiry": unix ms, "version": 2 }
//! ```
//!
//! The key is PBKDF2-HMAC-SHA256(pin, salt, 100 000 iterations). `expiry` sits
//! outside the ciphertext so stale envelopes can be discarded without the PIN.

use super::CryptoError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const PIN_ENVELOPE_VERSION: u8 = 2;
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinEnvelope {
    pub encrypted: String,
    pub salt: String,
    pub iv: String,
    #[serde(default)]
    pub expiry: Option<i64>,
    pub version: u8,
}

fn derive_key(pin: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

fn decode_field(field: &str, raw: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(raw)
        .map_err(|e| CryptoError::payload(field, format!("base64 decode error: {}", e)))
}

impl PinEnvelope {
    pub fn seal(plaintext: &str, pin: &str, expiry: Option<i64>) -> Result<Self, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let key = derive_key(pin, &salt);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::InvalidKey {
            key_type: "pin_derived_key".to_string(),
            reason: e.to_string(),
        })?;
        let encrypted = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed {
                operation: "pin_envelope".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            encrypted: STANDARD.encode(encrypted),
            salt: STANDARD.encode(salt),
            iv: STANDARD.encode(iv),
            expiry,
            version: PIN_ENVELOPE_VERSION,
        })
    }

    /// A wrong PIN surfaces as `DecryptionFailed` (tag mismatch).
    pub fn open(&self, pin: &str) -> Result<String, CryptoError> {
        if self.version != PIN_ENVELOPE_VERSION {
            return Err(CryptoError::payload(
                "version",
                format!("expected {}, got {}", PIN_ENVELOPE_VERSION, self.version),
            ));
        }
        let salt = decode_field("salt", &self.salt)?;
        let iv = decode_field("iv", &self.iv)?;
        let encrypted = decode_field("encrypted", &self.encrypted)?;
        if iv.len() != IV_LEN {
            return Err(CryptoError::payload(
                "iv",
                format!("expected {} bytes, got {}", IV_LEN, iv.len()),
            ));
        }

        let key = derive_key(pin, &salt);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::InvalidKey {
            key_type: "pin_derived_key".to_string(),
            reason: e.to_string(),
        })?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), encrypted.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed {
                operation: "pin_envelope".to_string(),
                reason: "authentication tag mismatch".to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::payload("encrypted", e))
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expiry, Some(expiry) if now_ms > expiry)
    }
}
