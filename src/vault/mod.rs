// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Wallet Custodian
//!
//! A secondary EOA whose private key is stored on chain in the WalletVault,
//! FHE-encrypted to the main account. Durable storage only ever holds the
//! session wallet's address under
//! `fheight_session_wallet_address_<lowercase main address>`.

pub mod contract;
pub mod custodian;
pub mod error;

pub use custodian::{format_eth, CustodianEvent, SessionWalletCustodian};
pub use error::VaultError;
