// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Key Manager
//!
//! Turns one wallet signature into a time-boxed decryption capability:
//!
//! 1. A decryption keypair comes from the backend (or a local fallback)
//! 2. The wallet signs an EIP-712 authorization over {publicKey, contracts,
//!    startTimestamp, durationDays}
//! 3. Keypair, signature and the exact signed strings are persisted under
//!    `fheight_fhe_session`
//! 4. Every decrypt reuses those strings verbatim; no further prompts
//!
//! The keypair is a decryption capability only. It is unrelated to any
//! blockchain signing key.

pub mod error;
pub mod manager;
pub mod record;

pub use error::SessionError;
pub use manager::{SessionInfo, SessionInit, SessionKeyManager};
pub use record::{SessionAuthorization, SessionRecord, StoredSession};
