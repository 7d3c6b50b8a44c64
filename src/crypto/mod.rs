// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidential-Compute Backend Adapter
//!
//! Wraps the FHE scheme behind [`FheBackend`]:
//!
//! - **Encrypt**: clear values into on-chain-safe ciphertext handles plus one input proof
//! - **User decrypt**: owner-only decryption authorized by a session signature
//! - **Public decrypt**: threshold decryption returning clear values and a proof
//!   the receiving contract can verify
//!
//! Two implementations: [`MockBackend`] (local chains, values packed into
//! handles) and [`RelayerBridgeBackend`] (the relayer SDK over HTTP).
//!
//! Also here: EIP-712 payload construction, handle conversions, and the
//! PIN-sealed session envelope.

pub mod backend;
pub mod eip712;
pub mod error;
pub mod handle;
pub mod keys;
pub mod mock;
pub mod pin;
pub mod relayer;

pub use backend::{
    ClearType, ClearValue, EncryptedInput, EncryptedPayload, FheBackend, FheBackends,
    PublicDecryptResult, UserDecryptRequest,
};
pub use eip712::{user_decrypt_typed_data, verify_signature, UserDecryptAuthorization};
pub use error::CryptoError;
pub use handle::{handle_from_u256, handle_to_hex, handle_to_u256, parse_handle};
pub use keys::{fallback_keypair, KeyMaterial, SessionKeypair};
pub use mock::MockBackend;
pub use pin::PinEnvelope;
pub use relayer::RelayerBridgeBackend;
