// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Main wallet provider surface
//!
//! The user's wallet is an external collaborator: it knows the connected
//! accounts and chain, signs EIP-712 payloads (the one "popup" a session
//! costs), and submits transactions. Two implementations ship:
//!
//! - [`LocalKeyWallet`]: a private key held by this process
//! - [`JsonRpcWallet`]: an EIP-1193 style JSON-RPC endpoint (unlocked node
//!   accounts or a wallet bridge)

pub mod json_rpc;
pub mod local;

pub use json_rpc::JsonRpcWallet;
pub use local::LocalKeyWallet;

use crate::chain::TxRequest;
use async_trait::async_trait;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature, H256};

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-3085 "unrecognized chain", returned by `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("User rejected the request")]
    UserRejected,

    #[error("No wallet account connected")]
    NotConnected,

    #[error("Wallet does not support {0}")]
    Unsupported(String),

    #[error("Wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Wallet transport error: {0}")]
    Transport(String),
}

impl WalletError {
    /// Map a JSON-RPC error object, pulling out the rejection code.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            WalletError::UserRejected
        } else {
            WalletError::Rpc {
                code,
                message: message.into(),
            }
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletError::UserRejected)
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_accounts`
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// `eth_signTypedData_v4`
    async fn sign_typed_data(
        &self,
        account: Address,
        data: &TypedData,
    ) -> Result<Signature, WalletError>;

    /// `eth_sendTransaction`
    async fn send_transaction(&self, from: Address, tx: &TxRequest) -> Result<H256, WalletError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let _ = chain_id;
        Err(WalletError::Unsupported(
            "wallet_switchEthereumChain".to_string(),
        ))
    }

    async fn primary_account(&self) -> Result<Address, WalletError> {
        self.accounts()
            .await?
            .first()
            .copied()
            .ok_or(WalletError::NotConnected)
    }
}
