// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error type shared by every confidential-compute backend, the EIP-712
//! builder, and the PIN envelope.
//!
//! ## Error Variants
//!
//! - **InvalidKey**: session keypair material is malformed
//! - **InvalidHandle**: a ciphertext handle is not 32 bytes of hex
//! - **InvalidPayload**: an encrypted input, envelope, or bridge response is malformed
//! - **EncryptionFailed** / **DecryptionFailed**: the backend refused or failed the operation
//! - **BackendUnavailable**: no backend may serve the requested network
//! - **Unauthorized**: decryption was requested for a contract the signature does not cover
//! - **Backend**: transport-level failure talking to a remote backend
//! - **Other**: anything else

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    InvalidKey {
        /// Which key failed (e.g. "session_public_key")
        key_type: String,
        reason: String,
    },

    InvalidHandle {
        reason: String,
    },

    InvalidPayload {
        field: String,
        reason: String,
    },

    EncryptionFailed {
        operation: String,
        reason: String,
    },

    /// Also returned for a wrong PIN: the AEAD tag does not verify.
    DecryptionFailed {
        operation: String,
        reason: String,
    },

    BackendUnavailable {
        network: String,
    },

    Unauthorized {
        contract: String,
    },

    Backend {
        operation: String,
        reason: String,
    },

    Other(String),
}

impl CryptoError {
    pub fn payload(field: &str, reason: impl fmt::Display) -> Self {
        CryptoError::InvalidPayload {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn backend(operation: &str, reason: impl fmt::Display) -> Self {
        CryptoError::Backend {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::InvalidHandle { reason } => write!(f, "Invalid handle: {}", reason),
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
            CryptoError::EncryptionFailed { operation, reason } => {
                write!(f, "Encryption failed during {}: {}", operation, reason)
            }
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::BackendUnavailable { network } => {
                write!(f, "No FHE backend available for network {}", network)
            }
            CryptoError::Unauthorized { contract } => {
                write!(f, "Contract {} is not covered by the decryption signature", contract)
            }
            CryptoError::Backend { operation, reason } => {
                write!(f, "Backend error during {}: {}", operation, reason)
            }
            CryptoError::Other(msg) => write!(f, "Crypto error: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<anyhow::Error> for CryptoError {
    fn from(err: anyhow::Error) -> Self {
        CryptoError::Other(err.to_string())
    }
}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidPayload {
            field: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

impl From<k256::elliptic_curve::Error> for CryptoError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "secp256k1".to_string(),
            reason: format!("k256 error: {}", err),
        }
    }
}

impl From<reqwest::Error> for CryptoError {
    fn from(err: reqwest::Error) -> Self {
        CryptoError::Backend {
            operation: "http".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(err: serde_json::Error) -> Self {
        CryptoError::InvalidPayload {
            field: "json".to_string(),
            reason: err.to_string(),
        }
    }
}
