// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ciphertext handle conversions
//!
//! Handles are 32-byte words. The canonical text form is `0x` followed by 64
//! lowercase hex digits.

use super::CryptoError;
use ethers::types::{H256, U256};

pub fn handle_to_hex(handle: &H256) -> String {
    format!("0x{}", hex::encode(handle.as_bytes()))
}

pub fn handle_from_u256(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from(bytes)
}

pub fn handle_to_u256(handle: &H256) -> U256 {
    U256::from_big_endian(handle.as_bytes())
}

/// Accepts short forms and left-pads them to 32 bytes.
pub fn parse_handle(raw: &str) -> Result<H256, CryptoError> {
    let digits = raw.trim().trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 64 {
        return Err(CryptoError::InvalidHandle {
            reason: format!("expected 1..=64 hex digits, got {}", digits.len()),
        });
    }
    let padded = format!("{:0>64}", digits);
    let bytes = hex::decode(&padded).map_err(|e| CryptoError::InvalidHandle {
        reason: e.to_string(),
    })?;
    Ok(H256::from_slice(&bytes))
}
