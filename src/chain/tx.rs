// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{ChainClient, ChainError};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, TransactionRequest, H256, U256, U64};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Plain gas limit for value transfers.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// A transaction before anyone has signed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<U256>,
}

impl TxRequest {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::zero(),
            gas_limit: None,
        }
    }

    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            data: Bytes::default(),
            value,
            gas_limit: Some(U256::from(TRANSFER_GAS_LIMIT)),
        }
    }

    pub fn with_gas(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(U256::from(gas_limit));
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Fixed-interval, bounded receipt polling.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 60,
        }
    }
}

/// Poll until the receipt exists or the attempt budget runs out.
pub async fn wait_for_receipt(
    chain: &dyn ChainClient,
    hash: H256,
    policy: ReceiptPolicy,
) -> Result<TransactionReceipt, ChainError> {
    for attempt in 1..=policy.max_attempts {
        if let Some(receipt) = chain.transaction_receipt(hash).await? {
            debug!("Receipt for {:?} after {} attempt(s)", hash, attempt);
            return Ok(receipt);
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    warn!(
        "⏱️  No receipt for {:?} after {} attempts",
        hash, policy.max_attempts
    );
    Err(ChainError::ReceiptTimeout {
        hash,
        attempts: policy.max_attempts,
    })
}

/// [`wait_for_receipt`] plus a status check.
pub async fn confirm(
    chain: &dyn ChainClient,
    hash: H256,
    policy: ReceiptPolicy,
) -> Result<TransactionReceipt, ChainError> {
    let receipt = wait_for_receipt(chain, hash, policy).await?;
    if receipt.status == Some(U64::zero()) {
        warn!("❌ Transaction {:?} reverted", hash);
        return Err(ChainError::TxReverted { hash });
    }
    info!(
        "✅ Transaction {:?} confirmed in block {:?}",
        hash, receipt.block_number
    );
    Ok(receipt)
}

/// Logs in `receipt` emitted by `address` only. Infrastructure contracts
/// (ACL, executor) log into the same receipt and must be ignored.
pub fn logs_from(receipt: &TransactionReceipt, address: Address) -> Vec<&Log> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == address)
        .collect()
}

/// Sign with an in-memory key and broadcast through `chain`, bypassing any
/// wallet provider.
pub async fn sign_and_send(
    chain: &dyn ChainClient,
    signer: &LocalWallet,
    tx: &TxRequest,
) -> Result<H256, ChainError> {
    let from = signer.address();
    let chain_id = chain.chain_id().await?;
    let nonce = chain.transaction_count(from).await?;
    let gas_price = chain.gas_price().await?;
    let gas = match tx.gas_limit {
        Some(limit) => limit,
        None => {
            chain
                .estimate_gas(from, tx.to, tx.data.clone(), tx.value)
                .await?
        }
    };

    let typed: TypedTransaction = TransactionRequest::new()
        .from(from)
        .to(tx.to)
        .data(tx.data.clone())
        .value(tx.value)
        .nonce(nonce)
        .gas(gas)
        .gas_price(gas_price)
        .chain_id(chain_id)
        .into();

    let signature = signer
        .clone()
        .with_chain_id(chain_id)
        .sign_transaction(&typed)
        .await
        .map_err(|e| ChainError::Signing(e.to_string()))?;

    let raw = typed.rlp_signed(&signature);
    let hash = chain.send_raw_transaction(raw).await?;
    debug!("Broadcast {:?} from {:?} (nonce {})", hash, from, nonce);
    Ok(hash)
}
