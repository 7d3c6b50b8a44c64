// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Read/broadcast access to an EVM chain
//!
//! [`ChainClient`] is the narrow surface the protocol components need from a
//! node: view calls, receipts, logs, and raw transaction broadcast. Wallet
//! prompts live elsewhere (see [`crate::wallet`]); nothing here ever asks a
//! user for anything.

pub mod rpc;
pub mod tx;

pub use rpc::RpcChainClient;
pub use tx::{confirm, logs_from, sign_and_send, wait_for_receipt, ReceiptPolicy, TxRequest};

use crate::config::{ChainRegistry, Network};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, Filter, Log, TransactionReceipt, H256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transaction {hash:?} reverted")]
    TxReverted { hash: H256 },

    #[error("No receipt for transaction {hash:?} after {attempts} attempts")]
    ReceiptTimeout { hash: H256, attempts: u32 },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("Transaction signing failed: {0}")]
    Signing(String),

    #[error("No RPC client for network: {0}")]
    NoClient(Network),
}

impl From<ethers::providers::ProviderError> for ChainError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        ChainError::Provider(err.to_string())
    }
}

impl ChainError {
    pub fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        ChainError::Decode {
            what: what.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// `eth_call`; `from` matters for views that read `msg.sender`.
    async fn call(
        &self,
        to: Address,
        data: Bytes,
        from: Option<Address>,
    ) -> Result<Bytes, ChainError>;

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<U256, ChainError>;

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ChainError>;

    async fn transaction_count(&self, address: Address) -> Result<U256, ChainError>;

    async fn gas_price(&self) -> Result<U256, ChainError>;

    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainError>;

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError>;
}

/// Read-only chain clients keyed by network.
#[derive(Clone, Default)]
pub struct ChainClients {
    clients: HashMap<Network, Arc<dyn ChainClient>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, network: Network, client: Arc<dyn ChainClient>) -> Self {
        self.clients.insert(network, client);
        self
    }

    /// One HTTP client per configured network.
    pub fn from_registry(registry: &ChainRegistry, interval: Duration) -> Result<Self, ChainError> {
        let mut clients = Self::new();
        for network in registry.list_supported_networks() {
            if let Some(settings) = registry.get(network) {
                let client = RpcChainClient::new(&settings.rpc_url, interval)?;
                clients = clients.with(network, Arc::new(client));
            }
        }
        Ok(clients)
    }

    pub fn get(&self, network: Network) -> Result<Arc<dyn ChainClient>, ChainError> {
        self.clients
            .get(&network)
            .cloned()
            .ok_or(ChainError::NoClient(network))
    }
}
