// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidential-compute backend surface
//!
//! [`FheBackend`] is what the session manager, game client and custodian see
//! of the FHE scheme. [`FheBackends`] picks the implementation for a network
//! from configuration; nothing probes the environment for an SDK.

use super::eip712::{user_decrypt_typed_data, UserDecryptAuthorization};
use super::{CryptoError, KeyMaterial, SessionKeypair};
use crate::config::{BackendKind, ChainRegistry, Network};
use async_trait::async_trait;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Bytes, H256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Width of an encrypted value, which decides how a clear value is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearType {
    Uint16,
    Uint256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearValue {
    Uint16(u16),
    Uint256(U256),
}

impl ClearValue {
    pub fn clear_type(&self) -> ClearType {
        match self {
            ClearValue::Uint16(_) => ClearType::Uint16,
            ClearValue::Uint256(_) => ClearType::Uint256,
        }
    }

    pub fn as_u256(&self) -> U256 {
        match self {
            ClearValue::Uint16(v) => U256::from(*v),
            ClearValue::Uint256(v) => *v,
        }
    }
}

/// Builder mirroring `createEncryptedInput(contract, user).addN(v)`.
#[derive(Debug, Clone)]
pub struct EncryptedInput {
    pub contract: Address,
    pub user: Address,
    pub values: Vec<ClearValue>,
}

impl EncryptedInput {
    pub fn new(contract: Address, user: Address) -> Self {
        Self {
            contract,
            user,
            values: Vec::new(),
        }
    }

    pub fn add16(mut self, value: u16) -> Self {
        self.values.push(ClearValue::Uint16(value));
        self
    }

    pub fn add256(mut self, value: U256) -> Self {
        self.values.push(ClearValue::Uint256(value));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One handle per input value plus a single proof covering all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub handles: Vec<H256>,
    pub input_proof: Bytes,
}

#[derive(Debug, Clone)]
pub struct UserDecryptRequest {
    pub handles: Vec<H256>,
    pub contract: Address,
    pub clear_type: ClearType,
    pub keypair: SessionKeypair,
    /// Hex without the `0x` prefix.
    pub signature: String,
    pub contracts: Vec<Address>,
    pub user: Address,
    pub chain_id: u64,
    pub start_timestamp: String,
    pub duration_days: String,
}

#[derive(Debug, Clone, Default)]
pub struct PublicDecryptResult {
    pub clear_values: HashMap<H256, U256>,
    pub abi_encoded_clear_values: Bytes,
    pub decryption_proof: Bytes,
}

#[async_trait]
pub trait FheBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn is_mock(&self) -> bool {
        self.kind() == BackendKind::Mock
    }

    /// Verifying contract named in the EIP-712 domain.
    fn verifying_contract(&self) -> Address;

    async fn generate_keypair(&self) -> Result<SessionKeypair, CryptoError>;

    fn create_eip712(
        &self,
        public_key: &KeyMaterial,
        contracts: &[Address],
        start_timestamp: &str,
        duration_days: &str,
        chain_id: u64,
    ) -> Result<TypedData, CryptoError> {
        user_decrypt_typed_data(&UserDecryptAuthorization {
            public_key,
            contracts,
            start_timestamp,
            duration_days,
            chain_id,
            verifying_contract: self.verifying_contract(),
        })
    }

    async fn encrypt(&self, input: &EncryptedInput) -> Result<EncryptedPayload, CryptoError>;

    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<HashMap<H256, U256>, CryptoError>;

    async fn public_decrypt(&self, handles: &[H256]) -> Result<PublicDecryptResult, CryptoError>;
}

/// Per-network backend selection.
#[derive(Clone)]
pub struct FheBackends {
    registry: ChainRegistry,
    mock: Arc<dyn FheBackend>,
    relayer: Option<Arc<dyn FheBackend>>,
}

impl FheBackends {
    pub fn new(
        registry: ChainRegistry,
        mock: Arc<dyn FheBackend>,
        relayer: Option<Arc<dyn FheBackend>>,
    ) -> Self {
        Self {
            registry,
            mock,
            relayer,
        }
    }

    /// Mock everywhere; for tests and offline runs.
    pub fn mock_only(registry: ChainRegistry, mock: Arc<dyn FheBackend>) -> Self {
        Self::new(registry, mock, None)
    }

    /// A missing relayer degrades to the mock on local networks and is an
    /// error on production ones.
    pub fn select(&self, network: Network) -> Result<Arc<dyn FheBackend>, CryptoError> {
        match self.registry.backend_kind(network) {
            BackendKind::Mock => Ok(self.mock.clone()),
            BackendKind::Relayer => match &self.relayer {
                Some(relayer) => Ok(relayer.clone()),
                None if network.is_production() => Err(CryptoError::BackendUnavailable {
                    network: network.to_string(),
                }),
                None => {
                    warn!(
                        "⚠️  No relayer backend for {}, using mock backend",
                        network
                    );
                    Ok(self.mock.clone())
                }
            },
        }
    }

    pub fn mock(&self) -> Arc<dyn FheBackend> {
        self.mock.clone()
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }
}
