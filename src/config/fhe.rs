// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coprocessor contract addresses handed to the relayer SDK instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FheSdkConfig {
    pub acl_contract: Address,
    pub kms_contract: Address,
    pub input_verifier_contract: Address,
    pub verifying_contract_decryption: Address,
    pub verifying_contract_input_verification: Address,
    pub gateway_chain_id: u64,
    pub relayer_url: String,
}

fn addr(raw: &str) -> Address {
    Address::from_str(raw).unwrap_or_else(|_| Address::zero())
}

impl FheSdkConfig {
    pub fn sepolia() -> Self {
        Self {
            acl_contract: addr("0xf0Ffdc93b7E186bC2f8CB3dAA75D86d1930A433D"),
            kms_contract: addr("0xbE0E383937d564D7FF0BC3b46c51f0bF8d5C311A"),
            input_verifier_contract: addr("0xBBC1fFCdc7C316aAAd72E807D9b0272BE8F84DA0"),
            verifying_contract_decryption: addr("0x5D8BD78e2ea6bbE41f26dFe9fdaEAa349e077478"),
            verifying_contract_input_verification: addr(
                "0x483b9dE06E4E4C7D35CCf5837A1668487406D955",
            ),
            gateway_chain_id: 10901,
            relayer_url: "https://relayer.testnet.zama.org".to_string(),
        }
    }
}

impl Default for FheSdkConfig {
    fn default() -> Self {
        Self::sepolia()
    }
}
