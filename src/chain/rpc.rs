// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{ChainClient, ChainError};
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// [`ChainClient`] over a plain JSON-RPC HTTP endpoint.
#[derive(Clone)]
pub struct RpcChainClient {
    provider: Arc<Provider<Http>>,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, interval: Duration) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ChainError::Provider(format!("Failed to create provider: {}", e)))?
            .interval(interval);
        debug!("Created RPC chain client for {}", rpc_url);
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_chainid().await?.as_u64())
    }

    async fn call(
        &self,
        to: Address,
        data: Bytes,
        from: Option<Address>,
    ) -> Result<Bytes, ChainError> {
        let mut request = TransactionRequest::new().to(to).data(data);
        if let Some(from) = from {
            request = request.from(from);
        }
        let tx: TypedTransaction = request.into();
        Ok(self.provider.call(&tx, None).await?)
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<U256, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(to)
            .data(data)
            .value(value)
            .into();
        Ok(self.provider.estimate_gas(&tx, None).await?)
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        Ok(self.provider.get_transaction_receipt(hash).await?)
    }

    async fn transaction_count(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn gas_price(&self) -> Result<U256, ChainError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(address, None).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainError> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError> {
        Ok(self.provider.get_logs(filter).await?)
    }
}
