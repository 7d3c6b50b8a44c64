// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::chain::ChainError;
use crate::crypto::CryptoError;
use crate::session::SessionError;
use ethers::types::H256;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GameError {
    #[error("Game client is not connected to a contract")]
    NotConnected,

    #[error("Invalid state for {operation}: {state}")]
    InvalidState { operation: String, state: String },

    #[error("No active game")]
    NotInGame,

    #[error("Transaction {hash:?} reverted")]
    TxReverted { hash: H256 },

    #[error("No receipt for {hash:?} after {attempts} attempts")]
    ReceiptTimeout { hash: H256, attempts: u32 },

    #[error("{event} event not found in receipt of {hash:?}")]
    EventNotFound { event: String, hash: H256 },

    #[error("Card in slot {slot} is not decrypted yet")]
    NotDecryptedYet { slot: usize },

    #[error("Hand slot {slot} out of range (hand size {size})")]
    SlotOutOfRange { slot: usize, size: usize },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Chain error: {0}")]
    Chain(ChainError),

    #[error("User rejected the transaction")]
    UserRejected,

    #[error("Transaction submission failed: {0}")]
    Submit(String),

    #[error("Failed to decode {0}")]
    Decode(String),
}

impl From<ChainError> for GameError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::TxReverted { hash } => GameError::TxReverted { hash },
            ChainError::ReceiptTimeout { hash, attempts } => {
                GameError::ReceiptTimeout { hash, attempts }
            }
            other => GameError::Chain(other),
        }
    }
}

impl GameError {
    pub fn is_user_rejection(&self) -> bool {
        match self {
            GameError::Session(e) => e.is_user_rejection(),
            GameError::UserRejected => true,
            _ => false,
        }
    }

    /// Hash of the failed transaction, when there was one.
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            GameError::TxReverted { hash }
            | GameError::ReceiptTimeout { hash, .. }
            | GameError::EventNotFound { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}
