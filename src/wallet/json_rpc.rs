// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{WalletError, WalletProvider, UNRECOGNIZED_CHAIN_CODE};
use crate::chain::TxRequest;
use crate::config::ChainRegistry;
use async_trait::async_trait;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature, H256, U256};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Wallet reached over an EIP-1193 style JSON-RPC endpoint.
#[derive(Clone)]
pub struct JsonRpcWallet {
    client: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
    registry: ChainRegistry,
}

impl JsonRpcWallet {
    pub fn new(url: &str, registry: ChainRegistry) -> Result<Self, WalletError> {
        url::Url::parse(url).map_err(|e| WalletError::Transport(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: Arc::new(AtomicU64::new(1)),
            registry,
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("wallet rpc #{} {}", id, method);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(WalletError::from_rpc(err.code, err.message));
        }
        parsed
            .result
            .ok_or_else(|| WalletError::Transport(format!("{} returned no result", method)))
    }

    fn as_str<'a>(value: &'a Value, method: &str) -> Result<&'a str, WalletError> {
        value
            .as_str()
            .ok_or_else(|| WalletError::Transport(format!("{} returned a non-string", method)))
    }

    async fn add_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let network = crate::config::Network::from_chain_id(chain_id).ok_or_else(|| {
            WalletError::Rpc {
                code: UNRECOGNIZED_CHAIN_CODE,
                message: format!("Unrecognized chain id {}", chain_id),
            }
        })?;
        let settings = self
            .registry
            .get(network)
            .ok_or_else(|| WalletError::Unsupported(format!("chain {}", chain_id)))?;

        info!("➕ Asking wallet to add {} ({})", settings.name, chain_id);
        self.request(
            "wallet_addEthereumChain",
            json!([{
                "chainId": format!("0x{:x}", chain_id),
                "chainName": settings.name,
                "rpcUrls": [settings.rpc_url],
                "nativeCurrency": { "name": "Ether", "symbol": "ETH", "decimals": 18 },
            }]),
        )
        .await?;
        Ok(())
    }
}

fn parse_quantity(raw: &str) -> Result<u64, WalletError> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|e| WalletError::Transport(format!("bad quantity {}: {}", raw, e)))
}

fn quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let result = self.request("eth_accounts", json!([])).await?;
        serde_json::from_value(result).map_err(|e| WalletError::Transport(e.to_string()))
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let result = self.request("eth_chainId", json!([])).await?;
        parse_quantity(Self::as_str(&result, "eth_chainId")?)
    }

    async fn sign_typed_data(
        &self,
        account: Address,
        data: &TypedData,
    ) -> Result<Signature, WalletError> {
        // v4 takes the payload as a JSON string, not an object.
        let payload =
            serde_json::to_string(data).map_err(|e| WalletError::Signing(e.to_string()))?;
        let result = self
            .request(
                "eth_signTypedData_v4",
                json!([format!("{:?}", account), payload]),
            )
            .await?;
        let raw = Self::as_str(&result, "eth_signTypedData_v4")?;
        Signature::from_str(raw).map_err(|e| WalletError::Signing(e.to_string()))
    }

    async fn send_transaction(&self, from: Address, tx: &TxRequest) -> Result<H256, WalletError> {
        let mut params = json!({
            "from": format!("{:?}", from),
            "to": format!("{:?}", tx.to),
            "data": tx.data.to_string(),
            "value": quantity(tx.value),
        });
        if let Some(gas) = tx.gas_limit {
            params["gas"] = Value::String(quantity(gas));
        }
        let result = self.request("eth_sendTransaction", json!([params])).await?;
        let raw = Self::as_str(&result, "eth_sendTransaction")?;
        H256::from_str(raw).map_err(|e| WalletError::Transport(e.to_string()))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let params = json!([{ "chainId": format!("0x{:x}", chain_id) }]);
        match self.request("wallet_switchEthereumChain", params.clone()).await {
            Ok(_) => Ok(()),
            Err(WalletError::Rpc { code, .. }) if code == UNRECOGNIZED_CHAIN_CODE => {
                warn!("Wallet does not know chain {}, adding it", chain_id);
                self.add_chain(chain_id).await?;
                self.request("wallet_switchEthereumChain", params).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
