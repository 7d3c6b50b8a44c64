// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted-deck game client
//!
//! Decks are padded to 40 cards, shuffled locally, encrypted one `euint16`
//! per card and submitted in the create/join transaction. From then on the
//! contract holds the only copy; the client reads hand and deck handles and
//! decrypts them with the session key.
//!
//! Status transitions:
//!
//! ```text
//! Disconnected -> Connected -> Creating|Joining -> InGame -> Ended
//!                     ^               |                        |
//!                     +--- on error --+          new game -----+
//! ```

pub mod client;
pub mod contract;
pub mod deck;
pub mod error;
pub mod events;
pub mod types;

pub use client::{GameSessionClient, MainWalletSubmitter, TxSubmitter};
pub use deck::{pad_deck, prepare_deck, shuffle, DECK_SIZE, INITIAL_HAND_SIZE, MAX_HAND_SIZE};
pub use error::GameError;
pub use events::{decode_log, decode_logs, GameEvent};
pub use types::{BoardUnit, ContractPhase, GameStateView, GameStatus, PlayerInfo};
