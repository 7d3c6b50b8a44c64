// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic mock backend for local chains
//!
//! Clear values are packed into the handle itself: a 16-bit value sits in the
//! low two bytes under a random 30-byte prefix, a 256-bit value is XORed with
//! `keccak(contract ‖ user)`. Decryption reads them straight back. None of this is cryptography; it
//! exists so local chains exercise the same call shapes as the relayer.

use super::backend::{
    ClearType, ClearValue, EncryptedInput, EncryptedPayload, FheBackend, PublicDecryptResult,
    UserDecryptRequest,
};
use super::eip712::verify_signature;
use super::handle::{handle_from_u256, handle_to_u256};
use super::{CryptoError, KeyMaterial, SessionKeypair};
use crate::config::{BackendKind, FheSdkConfig};
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use tiny_keccak::{Hasher, Keccak};
use tracing::debug;

pub const UINT16_MASK: u64 = 0xFFFF;

#[derive(Debug, Clone)]
pub struct MockBackend {
    verifying_contract: Address,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            verifying_contract: FheSdkConfig::default().verifying_contract_decryption,
        }
    }

    pub fn with_verifying_contract(verifying_contract: Address) -> Self {
        Self { verifying_contract }
    }

    fn pack_u16(input: &EncryptedInput, index: usize, value: u16) -> H256 {
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);

        let mut hasher = Keccak::v256();
        hasher.update(input.contract.as_bytes());
        hasher.update(input.user.as_bytes());
        hasher.update(&(index as u64).to_be_bytes());
        hasher.update(&nonce);
        let mut prefix = [0u8; 32];
        hasher.finalize(&mut prefix);

        let mut bytes = [0u8; 32];
        bytes[..30].copy_from_slice(&prefix[..30]);
        bytes[30..].copy_from_slice(&value.to_be_bytes());
        H256::from(bytes)
    }

    /// Scope mask for 256-bit values; a stored handle never equals its value.
    fn scope_mask(contract: Address, user: Address) -> U256 {
        let mut hasher = Keccak::v256();
        hasher.update(contract.as_bytes());
        hasher.update(user.as_bytes());
        let mut digest = [0u8; 32];
        hasher.finalize(&mut digest);
        U256::from_big_endian(&digest)
    }

    /// Reads a clear 256-bit value out of a handle sealed for `contract` and
    /// `user`.
    pub fn unseal(handle: &H256, contract: Address, user: Address) -> U256 {
        handle_to_u256(handle) ^ Self::scope_mask(contract, user)
    }

    /// Reads a clear value back out of a handle. `Uint256` handles come back
    /// still sealed; see [`MockBackend::unseal`].
    pub fn unpack(handle: &H256, clear_type: ClearType) -> U256 {
        let raw = handle_to_u256(handle);
        match clear_type {
            ClearType::Uint16 => raw & U256::from(UINT16_MASK),
            ClearType::Uint256 => raw,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FheBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn verifying_contract(&self) -> Address {
        self.verifying_contract
    }

    async fn generate_keypair(&self) -> Result<SessionKeypair, CryptoError> {
        let signing = SigningKey::random(&mut OsRng);
        let public = signing.verifying_key().to_encoded_point(false);
        Ok(SessionKeypair {
            public_key: KeyMaterial::binary(public.as_bytes().to_vec()),
            private_key: KeyMaterial::binary(signing.to_bytes().to_vec()),
        })
    }

    async fn encrypt(&self, input: &EncryptedInput) -> Result<EncryptedPayload, CryptoError> {
        if input.is_empty() {
            return Err(CryptoError::EncryptionFailed {
                operation: "mock_encrypt".to_string(),
                reason: "no values added to input".to_string(),
            });
        }
        let handles: Vec<H256> = input
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| match value {
                ClearValue::Uint16(v) => Self::pack_u16(input, i, *v),
                ClearValue::Uint256(v) => {
                    handle_from_u256(*v ^ Self::scope_mask(input.contract, input.user))
                }
            })
            .collect();

        let mut hasher = Keccak::v256();
        for handle in &handles {
            hasher.update(handle.as_bytes());
        }
        let mut digest = [0u8; 32];
        hasher.finalize(&mut digest);
        let mut proof = vec![handles.len() as u8];
        proof.extend_from_slice(&digest);

        debug!("mock encrypt: {} value(s) for {:?}", handles.len(), input.contract);
        Ok(EncryptedPayload {
            handles,
            input_proof: Bytes::from(proof),
        })
    }

    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<HashMap<H256, U256>, CryptoError> {
        if !request.contracts.contains(&request.contract) {
            return Err(CryptoError::Unauthorized {
                contract: format!("{:?}", request.contract),
            });
        }

        let contracts = request.contracts.clone();
        let typed = self.create_eip712(
            &request.keypair.public_key,
            &contracts,
            &request.start_timestamp,
            &request.duration_days,
            request.chain_id,
        )?;
        verify_signature(&typed, &request.signature, request.user).map_err(|e| {
            CryptoError::DecryptionFailed {
                operation: "mock_user_decrypt".to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(request
            .handles
            .iter()
            .map(|h| {
                let value = match request.clear_type {
                    ClearType::Uint256 => Self::unseal(h, request.contract, request.user),
                    other => Self::unpack(h, other),
                };
                (*h, value)
            })
            .collect())
    }

    async fn public_decrypt(&self, handles: &[H256]) -> Result<PublicDecryptResult, CryptoError> {
        let mut clear_values = HashMap::new();
        let mut tokens = Vec::with_capacity(handles.len());
        for handle in handles {
            let value = Self::unpack(handle, ClearType::Uint16);
            clear_values.insert(*handle, value);
            tokens.push(Token::Uint(value));
        }
        Ok(PublicDecryptResult {
            clear_values,
            abi_encoded_clear_values: Bytes::from(encode(&tokens)),
            decryption_proof: Bytes::default(),
        })
    }
}
