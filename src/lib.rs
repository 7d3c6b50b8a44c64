// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod app;
pub mod chain;
pub mod cli;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod game;
pub mod network;
pub mod session;
pub mod storage;
pub mod vault;
pub mod version;
pub mod wallet;

pub use app::{ClientParts, FheightClient};
pub use config::{ClientConfig, Network};
pub use game::{GameError, GameSessionClient, GameStatus};
pub use network::NetworkContext;
pub use session::{SessionError, SessionKeyManager};
pub use vault::{SessionWalletCustodian, VaultError};
pub use wallet::{WalletError, WalletProvider};
