// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session keypair material
//!
//! Keys come back from the backend in one of three shapes: a serialized
//! binary buffer (`{"type":"Buffer","data":[...]}`), a long hex string, or an
//! opaque JSON object. All three round-trip through the session record
//! unchanged.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest hex string accepted as real key material.
pub const MIN_HEX_KEY_LEN: usize = 1000;

/// Uncompressed secp256k1 points hex-encode well under this length; anything
/// `0x04`-prefixed and shorter is the legacy placeholder key.
const LEGACY_POINT_HEX_LEN: usize = 200;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferBytes {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyMaterial {
    Binary(BufferBytes),
    Hex(String),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl KeyMaterial {
    pub fn binary(data: Vec<u8>) -> Self {
        KeyMaterial::Binary(BufferBytes {
            kind: "Buffer".to_string(),
            data,
        })
    }

    /// Format check applied when a persisted record is loaded.
    pub fn is_valid_format(&self) -> bool {
        match self {
            KeyMaterial::Binary(buf) => buf.kind == "Buffer",
            KeyMaterial::Object(_) => true,
            KeyMaterial::Hex(s) => {
                if s.starts_with("0x04") && s.len() < LEGACY_POINT_HEX_LEN {
                    return false;
                }
                s.len() > MIN_HEX_KEY_LEN
            }
        }
    }

    /// Raw bytes for binary and hex keys.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            KeyMaterial::Binary(buf) => Some(buf.data.clone()),
            KeyMaterial::Hex(s) => hex::decode(s.trim_start_matches("0x")).ok(),
            KeyMaterial::Object(_) => None,
        }
    }

    /// `0x`-prefixed hex suitable for an EIP-712 `bytes` field.
    pub fn to_hex(&self) -> String {
        match self {
            KeyMaterial::Binary(buf) => format!("0x{}", hex::encode(&buf.data)),
            KeyMaterial::Hex(s) if s.starts_with("0x") => s.clone(),
            KeyMaterial::Hex(s) => format!("0x{}", s),
            KeyMaterial::Object(map) => {
                let json = serde_json::Value::Object(map.clone()).to_string();
                format!("0x{}", hex::encode(json.as_bytes()))
            }
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            KeyMaterial::Binary(_) => "binary",
            KeyMaterial::Hex(_) => "hex",
            KeyMaterial::Object(_) => "object",
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = match self {
            KeyMaterial::Binary(buf) => buf.data.len(),
            KeyMaterial::Hex(s) => s.len(),
            KeyMaterial::Object(map) => map.len(),
        };
        write!(f, "KeyMaterial::{}({})", self.shape(), len)
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeypair {
    pub public_key: KeyMaterial,
    pub private_key: KeyMaterial,
}

impl SessionKeypair {
    /// The public half decides; private keys are not length-checked.
    pub fn is_valid_format(&self) -> bool {
        self.public_key.is_valid_format()
    }
}

impl fmt::Debug for SessionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeypair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Local secp256k1 keypair used when no backend can issue one. Only the mock
/// backend accepts it, and the format check rejects it on reload.
pub fn fallback_keypair() -> SessionKeypair {
    let signing = SigningKey::random(&mut OsRng);
    let public = signing.verifying_key().to_encoded_point(false);
    SessionKeypair {
        public_key: KeyMaterial::Hex(format!("0x{}", hex::encode(public.as_bytes()))),
        private_key: KeyMaterial::Hex(format!("0x{}", hex::encode(signing.to_bytes()))),
    }
}
