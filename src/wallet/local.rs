// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{WalletError, WalletProvider};
use crate::chain::{sign_and_send, ChainClients, TxRequest};
use crate::config::Network;
use crate::network::NetworkContext;
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature, H256};
use std::str::FromStr;
use tracing::info;

/// Main wallet backed by a private key this process holds (CLI, bots,
/// local development). Never prompts, so it never rejects.
#[derive(Clone)]
pub struct LocalKeyWallet {
    signer: LocalWallet,
    chains: ChainClients,
    network: NetworkContext,
}

impl LocalKeyWallet {
    pub fn new(signer: LocalWallet, chains: ChainClients, network: NetworkContext) -> Self {
        Self {
            signer,
            chains,
            network,
        }
    }

    pub fn from_private_key(
        private_key: &str,
        chains: ChainClients,
        network: NetworkContext,
    ) -> Result<Self, WalletError> {
        let key = private_key.trim().trim_start_matches("0x");
        let signer =
            LocalWallet::from_str(key).map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(Self::new(signer, chains, network))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.signer.address()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.network.state().await.chain_id)
    }

    async fn sign_typed_data(
        &self,
        account: Address,
        data: &TypedData,
    ) -> Result<Signature, WalletError> {
        if account != self.signer.address() {
            return Err(WalletError::NotConnected);
        }
        self.signer
            .sign_typed_data(data)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))
    }

    async fn send_transaction(&self, from: Address, tx: &TxRequest) -> Result<H256, WalletError> {
        if from != self.signer.address() {
            return Err(WalletError::NotConnected);
        }
        let network = self.network.current().await;
        let chain = self
            .chains
            .get(network)
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        sign_and_send(chain.as_ref(), &self.signer, tx)
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let network = Network::from_chain_id(chain_id).ok_or_else(|| WalletError::Rpc {
            code: super::UNRECOGNIZED_CHAIN_CODE,
            message: format!("Unrecognized chain id {}", chain_id),
        })?;
        self.network.network_changed(chain_id).await;
        info!("Local wallet switched to {}", network);
        Ok(())
    }
}
