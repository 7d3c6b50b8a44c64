// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EIP-712 payload for user-decrypt authorization
//!
//! The wallet signs `UserDecryptRequestVerification` once per session. The
//! coprocessor rebuilds the same struct from the decrypt request, so
//! `startTimestamp` and `durationDays` must be byte-identical to what was
//! signed.

use super::{CryptoError, KeyMaterial};
use ethers::types::transaction::eip712::{Eip712, TypedData};
use ethers::types::{Address, Signature, H256};
use serde_json::json;
use std::str::FromStr;

pub const DOMAIN_NAME: &str = "Decryption";
pub const DOMAIN_VERSION: &str = "1";
pub const PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

/// Everything that goes into the signed struct.
#[derive(Debug, Clone)]
pub struct UserDecryptAuthorization<'a> {
    pub public_key: &'a KeyMaterial,
    pub contracts: &'a [Address],
    pub start_timestamp: &'a str,
    pub duration_days: &'a str,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

pub fn user_decrypt_typed_data(auth: &UserDecryptAuthorization<'_>) -> Result<TypedData, CryptoError> {
    let contracts: Vec<String> = auth.contracts.iter().map(|a| format!("{:?}", a)).collect();
    let value = json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            PRIMARY_TYPE: [
                { "name": "publicKey", "type": "bytes" },
                { "name": "contractAddresses", "type": "address[]" },
                { "name": "startTimestamp", "type": "uint256" },
                { "name": "durationDays", "type": "uint256" },
                { "name": "extraData", "type": "bytes" }
            ]
        },
        "primaryType": PRIMARY_TYPE,
        "domain": {
            "name": DOMAIN_NAME,
            "version": DOMAIN_VERSION,
            "chainId": auth.chain_id,
            "verifyingContract": format!("{:?}", auth.verifying_contract)
        },
        "message": {
            "publicKey": auth.public_key.to_hex(),
            "contractAddresses": contracts,
            "startTimestamp": auth.start_timestamp,
            "durationDays": auth.duration_days,
            "extraData": "0x00"
        }
    });
    serde_json::from_value(value).map_err(|e| CryptoError::payload("eip712", e))
}

/// Recover-and-compare check on a signature over `typed`. Accepts the
/// signature with or without its `0x` prefix.
pub fn verify_signature(typed: &TypedData, signature: &str, signer: Address) -> Result<(), CryptoError> {
    let digest = typed
        .encode_eip712()
        .map_err(|e| CryptoError::payload("eip712", e))?;
    let sig = Signature::from_str(signature.trim_start_matches("0x")).map_err(|e| {
        CryptoError::payload("signature", e)
    })?;
    sig.verify(H256::from(digest), signer)
        .map_err(|e| CryptoError::payload("signature", e))
}
