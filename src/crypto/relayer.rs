// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relayer SDK bridge backend
//!
//! Real encryption and decryption run in the relayer SDK, which this process
//! reaches through a local HTTP bridge. Each call carries the coprocessor
//! config so the bridge can hold one SDK instance per configuration.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Purpose                    |
//! |--------|----------------------|----------------------------|
//! | POST   | `/v1/keypair`        | `generateKeypair()`        |
//! | POST   | `/v1/encrypt`        | encrypted input + proof    |
//! | POST   | `/v1/user-decrypt`   | owner-only decrypt         |
//! | POST   | `/v1/public-decrypt` | threshold decrypt w/ proof |

use super::backend::{
    ClearValue, EncryptedInput, EncryptedPayload, FheBackend, PublicDecryptResult,
    UserDecryptRequest,
};
use super::handle::{handle_to_hex, parse_handle};
use super::{CryptoError, SessionKeypair};
use crate::config::{BackendKind, BridgeSettings, FheSdkConfig};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptResponse {
    handles: Vec<String>,
    input_proof: String,
}

#[derive(Debug, Deserialize)]
struct UserDecryptResponse {
    results: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicDecryptResponse {
    clear_values: HashMap<String, Value>,
    abi_encoded_clear_values: String,
    decryption_proof: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HandleContractPair {
    handle: String,
    contract_address: String,
}

pub struct RelayerBridgeBackend {
    client: reqwest::Client,
    base_url: String,
    sdk: FheSdkConfig,
}

impl RelayerBridgeBackend {
    pub fn new(bridge: &BridgeSettings, sdk: FheSdkConfig) -> Result<Self, CryptoError> {
        url::Url::parse(&bridge.url).map_err(|e| CryptoError::payload("bridge_url", e))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(bridge.timeout_secs))
            .build()?;
        info!("🔐 Relayer bridge backend at {}", bridge.url);
        Ok(Self {
            client,
            base_url: bridge.url.trim_end_matches('/').to_string(),
            sdk,
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, CryptoError> {
        let request_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, path);
        debug!("[{}] POST {}", request_id, url);

        let response = self
            .client
            .post(&url)
            .header("x-request-id", &request_id)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CryptoError::backend(path, format!("HTTP {}: {}", status, text)));
        }
        Ok(response.json::<T>().await?)
    }
}

fn decode_bytes(field: &str, raw: &str) -> Result<Bytes, CryptoError> {
    let data = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| CryptoError::payload(field, e))?;
    Ok(Bytes::from(data))
}

/// Clear values arrive as JSON numbers, decimal strings, or hex strings.
fn parse_clear_value(value: &Value) -> Result<U256, CryptoError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| CryptoError::payload("clear_value", format!("not a uint: {}", n))),
        Value::Bool(b) => Ok(U256::from(*b as u8)),
        Value::String(s) if s.starts_with("0x") => {
            U256::from_str(s).map_err(|e| CryptoError::payload("clear_value", e))
        }
        Value::String(s) => {
            U256::from_dec_str(s).map_err(|e| CryptoError::payload("clear_value", e))
        }
        other => Err(CryptoError::payload(
            "clear_value",
            format!("unexpected {}", other),
        )),
    }
}

fn parse_value_map(raw: HashMap<String, Value>) -> Result<HashMap<H256, U256>, CryptoError> {
    raw.iter()
        .map(|(k, v)| Ok((parse_handle(k)?, parse_clear_value(v)?)))
        .collect()
}

#[async_trait]
impl FheBackend for RelayerBridgeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relayer
    }

    fn verifying_contract(&self) -> Address {
        self.sdk.verifying_contract_decryption
    }

    async fn generate_keypair(&self) -> Result<SessionKeypair, CryptoError> {
        self.post("/v1/keypair", json!({ "config": self.sdk })).await
    }

    async fn encrypt(&self, input: &EncryptedInput) -> Result<EncryptedPayload, CryptoError> {
        let values: Vec<Value> = input
            .values
            .iter()
            .map(|v| match v {
                ClearValue::Uint16(x) => json!({ "type": "uint16", "value": x.to_string() }),
                ClearValue::Uint256(x) => json!({ "type": "uint256", "value": x.to_string() }),
            })
            .collect();
        let body = json!({
            "config": self.sdk,
            "contractAddress": format!("{:?}", input.contract),
            "userAddress": ethers::utils::to_checksum(&input.user, None),
            "values": values,
        });

        let response: EncryptResponse = self.post("/v1/encrypt", body).await?;
        if response.handles.len() != input.len() {
            return Err(CryptoError::EncryptionFailed {
                operation: "relayer_encrypt".to_string(),
                reason: format!(
                    "expected {} handles, bridge returned {}",
                    input.len(),
                    response.handles.len()
                ),
            });
        }
        let handles = response
            .handles
            .iter()
            .map(|h| parse_handle(h))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EncryptedPayload {
            handles,
            input_proof: decode_bytes("inputProof", &response.input_proof)?,
        })
    }

    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<HashMap<H256, U256>, CryptoError> {
        let pairs: Vec<HandleContractPair> = request
            .handles
            .iter()
            .map(|h| HandleContractPair {
                handle: handle_to_hex(h),
                contract_address: format!("{:?}", request.contract),
            })
            .collect();
        let contracts: Vec<String> = request
            .contracts
            .iter()
            .map(|a| format!("{:?}", a))
            .collect();
        let body = json!({
            "config": self.sdk,
            "handleContractPairs": pairs,
            "privateKey": request.keypair.private_key,
            "publicKey": request.keypair.public_key,
            "signature": request.signature,
            "contractAddresses": contracts,
            "userAddress": ethers::utils::to_checksum(&request.user, None),
            "startTimestamp": request.start_timestamp,
            "durationDays": request.duration_days,
        });

        let response: UserDecryptResponse = self.post("/v1/user-decrypt", body).await?;
        parse_value_map(response.results)
    }

    async fn public_decrypt(&self, handles: &[H256]) -> Result<PublicDecryptResult, CryptoError> {
        let hex_handles: Vec<String> = handles.iter().map(handle_to_hex).collect();
        let body = json!({ "config": self.sdk, "handles": hex_handles });

        let response: PublicDecryptResponse = self.post("/v1/public-decrypt", body).await?;
        Ok(PublicDecryptResult {
            clear_values: parse_value_map(response.clear_values)?,
            abi_encoded_clear_values: decode_bytes(
                "abiEncodedClearValues",
                &response.abi_encoded_clear_values,
            )?,
            decryption_proof: decode_bytes("decryptionProof", &response.decryption_proof)?,
        })
    }
}
