// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::CryptoError;
use crate::wallet::WalletError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("No session keypair, call generate_keypair first")]
    NoKeypair,

    #[error("No wallet provider available")]
    NoWalletProvider,

    #[error("No wallet account connected")]
    NoAccount,

    #[error("User rejected the signature request")]
    UserRejected,

    #[error("Session is missing or expired")]
    SessionInvalid,

    #[error("Cached session lacks the exact signing parameters, clear and re-initialize")]
    ParamsMissing,

    #[error("Wrong PIN for stored session")]
    WrongPin,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend error: {0}")]
    Backend(#[from] CryptoError),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid session record: {0}")]
    InvalidRecord(String),

    #[error("Backend returned no clear value for handle {handle}")]
    MissingValue { handle: String },
}

impl SessionError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, SessionError::UserRejected)
    }

    /// Capability errors a fresh `initialize_session` can fix.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::NoKeypair
                | SessionError::SessionInvalid
                | SessionError::ParamsMissing
                | SessionError::InvalidRecord(_)
        )
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<WalletError> for SessionError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected => SessionError::UserRejected,
            WalletError::NotConnected => SessionError::NoAccount,
            other => SessionError::Wallet(other.to_string()),
        }
    }
}
