// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! WalletVault contract ABI
//!
//! The vault stores one encrypted `euint256` (the session wallet's private
//! key) per main address. ACL on the handle grants decrypt rights to the
//! owner only.

use ethers::prelude::abigen;

abigen!(
    WalletVault,
    r#"[
        function storeKey(bytes32 encryptedKey, bytes inputProof, address sessionWallet)
        function getEncryptedKey() view returns (bytes32)
        function hasKey(address owner) view returns (bool)
        function getSessionWallet(address owner) view returns (address)
        function clearKey()
        event KeyStored(address indexed owner, address indexed sessionWallet)
        event KeyCleared(address indexed owner)
    ]"#
);
