// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::chain::ChainError;
use crate::config::Network;
use crate::crypto::CryptoError;
use crate::session::SessionError;
use crate::wallet::WalletError;
use ethers::types::H256;

#[derive(Debug, Clone, thiserror::Error)]
pub enum VaultError {
    #[error("No WalletVault deployed on {network}")]
    VaultNotConfigured { network: Network },

    #[error("No session wallet key stored on chain for this account")]
    NoStoredKey,

    #[error("Session wallet is not loaded")]
    WalletNotLoaded,

    #[error("Main wallet is not connected")]
    NotConnected,

    #[error("Vault decrypt returned no value")]
    EmptyDecrypt,

    #[error("Transaction {hash:?} reverted")]
    TxReverted { hash: H256 },

    #[error("No receipt for {hash:?} after {attempts} attempts")]
    ReceiptTimeout { hash: H256, attempts: u32 },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Chain error: {0}")]
    Chain(ChainError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid session wallet key: {0}")]
    InvalidKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<ChainError> for VaultError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::TxReverted { hash } => VaultError::TxReverted { hash },
            ChainError::ReceiptTimeout { hash, attempts } => {
                VaultError::ReceiptTimeout { hash, attempts }
            }
            other => VaultError::Chain(other),
        }
    }
}

impl VaultError {
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        VaultError::Storage(err.to_string())
    }

    pub fn is_user_rejection(&self) -> bool {
        match self {
            VaultError::Wallet(e) => e.is_user_rejection(),
            VaultError::Session(e) => e.is_user_rejection(),
            _ => false,
        }
    }
}
