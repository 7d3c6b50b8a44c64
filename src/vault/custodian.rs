// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::contract::{
    ClearKeyCall, GetEncryptedKeyCall, GetEncryptedKeyReturn, GetSessionWalletCall,
    GetSessionWalletReturn, HasKeyCall, HasKeyReturn, StoreKeyCall,
};
use super::VaultError;
use crate::chain::{confirm, sign_and_send, ChainClient, ChainClients, ReceiptPolicy, TxRequest};
use crate::config::{ChainRegistry, Network, VaultSettings};
use crate::crypto::{ClearType, CryptoError, EncryptedInput, FheBackends};
use crate::game::{GameError, TxSubmitter};
use crate::network::NetworkContext;
use crate::session::SessionKeyManager;
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use ethers::utils::{parse_ether, to_checksum};
use rand::rngs::OsRng;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle notifications for UIs and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CustodianEvent {
    Progress { step: u8, total: u8, message: String },
    Created { address: Address },
    SyncCompleted { address: Option<Address> },
    BalanceChanged { balance: String },
    Cleared,
}

const CREATE_STEPS: u8 = 4;

#[derive(Default)]
struct CustodianState {
    address: Option<Address>,
    signer: Option<LocalWallet>,
    balance: Option<String>,
    syncing: bool,
    synced: bool,
}

/// Custody of the secondary "session wallet" that signs gameplay
/// transactions without main-wallet prompts.
///
/// The private key exists in plaintext only in memory. Durable storage holds
/// the session wallet's address; the key itself lives in the WalletVault as
/// an FHE ciphertext only its owner can decrypt.
#[derive(Clone)]
pub struct SessionWalletCustodian {
    session: Arc<SessionKeyManager>,
    backends: FheBackends,
    chains: ChainClients,
    network: NetworkContext,
    registry: ChainRegistry,
    store: Arc<dyn KeyValueStore>,
    settings: VaultSettings,
    receipts: ReceiptPolicy,
    state: Arc<RwLock<CustodianState>>,
    op: Arc<Mutex<()>>,
    events: broadcast::Sender<CustodianEvent>,
    poller: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionWalletCustodian {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<SessionKeyManager>,
        backends: FheBackends,
        chains: ChainClients,
        network: NetworkContext,
        registry: ChainRegistry,
        store: Arc<dyn KeyValueStore>,
        settings: VaultSettings,
        receipts: ReceiptPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            session,
            backends,
            chains,
            network,
            registry,
            store,
            settings,
            receipts,
            state: Arc::new(RwLock::new(CustodianState::default())),
            op: Arc::new(Mutex::new(())),
            events,
            poller: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CustodianEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CustodianEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn progress(&self, step: u8, message: &str) {
        info!("[{}/{}] {}", step, CREATE_STEPS, message);
        self.emit(CustodianEvent::Progress {
            step,
            total: CREATE_STEPS,
            message: message.to_string(),
        });
    }

    fn storage_key(&self, main: Address) -> String {
        format!("{}{:?}", self.settings.storage_prefix, main)
    }

    fn chain(&self, network: Network) -> Result<Arc<dyn ChainClient>, VaultError> {
        Ok(self.chains.get(network)?)
    }

    fn vault_for(&self, network: Network) -> Result<Address, VaultError> {
        self.registry
            .wallet_vault(network)
            .ok_or(VaultError::VaultNotConfigured { network })
    }

    async fn main_account(&self) -> Result<Address, VaultError> {
        let wallet = self.session.wallet().await?;
        Ok(wallet.primary_account().await?)
    }

    async fn view<R: AbiDecode>(
        &self,
        network: Network,
        vault: Address,
        data: Vec<u8>,
        from: Address,
        what: &str,
    ) -> Result<R, VaultError> {
        let out = self
            .chain(network)?
            .call(vault, Bytes::from(data), Some(from))
            .await?;
        R::decode(out.as_ref()).map_err(|e| {
            VaultError::Chain(crate::chain::ChainError::decode(what, e))
        })
    }

    async fn read_local(&self, main: Address) -> Result<Option<Address>, VaultError> {
        let raw = self
            .store
            .get(&self.storage_key(main))
            .await
            .map_err(VaultError::storage)?;
        Ok(raw.and_then(|raw| match Address::from_str(raw.trim()) {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("Ignoring unparsable session wallet record: {}", e);
                None
            }
        }))
    }

    async fn write_local(&self, main: Address, address: Address) -> Result<(), VaultError> {
        self.store
            .set(&self.storage_key(main), &to_checksum(&address, None))
            .await
            .map_err(VaultError::storage)
    }

    // ---- lifecycle ----

    /// Loads the locally recorded session wallet address, if any. Never
    /// touches the chain and never prompts.
    pub async fn initialize(&self) -> Result<Option<Address>, VaultError> {
        let main = self.main_account().await?;
        let address = self.read_local(main).await?;
        let mut state = self.state.write().await;
        if state.address != address {
            state.signer = None;
        }
        state.address = address;
        if let Some(addr) = address {
            info!("💼 Session wallet on record: {:?}", addr);
        }
        Ok(address)
    }

    /// Generates a session wallet and stores its key in the vault, encrypted
    /// to the main account. Nothing is persisted unless the store
    /// transaction confirms.
    pub async fn create_wallet(&self) -> Result<Address, VaultError> {
        let _op = self.op.lock().await;
        let network = self.network.current().await;
        let vault = self.vault_for(network)?;
        let wallet = self.session.wallet().await?;
        let main = wallet.primary_account().await?;

        self.progress(1, "Generating session wallet");
        let signer = LocalWallet::new(&mut OsRng);
        let address = signer.address();

        self.progress(2, "Encrypting session wallet key");
        let key = U256::from_big_endian(signer.signer().to_bytes().as_slice());
        let backend = self.backends.select(network)?;
        let payload = backend
            .encrypt(&EncryptedInput::new(vault, main).add256(key))
            .await?;
        let handle = payload
            .handles
            .first()
            .copied()
            .ok_or_else(|| CryptoError::payload("handles", "encrypt returned no handle"))?;

        self.progress(3, "Storing encrypted key in vault");
        let call = StoreKeyCall {
            encrypted_key: handle.0,
            input_proof: payload.input_proof,
            session_wallet: address,
        };
        let tx = TxRequest::call(vault, call.encode()).with_gas(self.settings.store_gas_limit);
        let hash = wallet.send_transaction(main, &tx).await?;
        confirm(self.chain(network)?.as_ref(), hash, self.receipts).await?;

        self.progress(4, "Saving session wallet address");
        self.write_local(main, address).await?;
        {
            let mut state = self.state.write().await;
            state.address = Some(address);
            state.signer = Some(signer);
            state.balance = None;
            state.synced = true;
        }
        info!("✅ Session wallet created: {:?}", address);
        self.emit(CustodianEvent::Created { address });
        Ok(address)
    }

    /// Decrypts the vaulted key with the session key and holds it in memory.
    /// Re-authorizes the session first if it does not cover the vault.
    pub async fn retrieve_from_chain(&self) -> Result<String, VaultError> {
        let _op = self.op.lock().await;
        let signer = self.retrieve_locked().await?;
        Ok(format!("0x{}", hex::encode(signer.signer().to_bytes())))
    }

    async fn retrieve_locked(&self) -> Result<LocalWallet, VaultError> {
        let network = self.network.current().await;
        let vault = self.vault_for(network)?;
        let main = self.main_account().await?;

        let mut contracts = self.session.authorized_contracts().await;
        for contract in [Some(vault), self.registry.game_session(network)]
            .into_iter()
            .flatten()
        {
            if !contracts.contains(&contract) {
                contracts.push(contract);
            }
        }
        let valid = self.session.is_session_valid().await;
        if valid && !self.session.covers(vault).await {
            info!("🔑 Session does not cover the vault, re-authorizing");
            self.session.escalate(&contracts).await?;
        } else if !valid {
            // A stored record covering the vault is reused without a prompt.
            self.session.initialize_session(&contracts).await?;
        }

        let has: HasKeyReturn = self
            .view(network, vault, HasKeyCall { owner: main }.encode(), main, "hasKey")
            .await?;
        if !has.0 {
            return Err(VaultError::NoStoredKey);
        }
        let encrypted: GetEncryptedKeyReturn = self
            .view(
                network,
                vault,
                GetEncryptedKeyCall.encode(),
                main,
                "getEncryptedKey",
            )
            .await?;
        let handle = H256::from(encrypted.0);
        debug!("Vault ciphertext handle read for {:?}", main);

        let values = self
            .session
            .decrypt_as(&[handle], vault, ClearType::Uint256)
            .await?;
        let key = values.first().copied().ok_or(VaultError::EmptyDecrypt)?;
        let mut bytes = [0u8; 32];
        key.to_big_endian(&mut bytes);
        let signer =
            LocalWallet::from_bytes(&bytes).map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        let address = signer.address();

        match self.read_local(main).await? {
            Some(recorded) if recorded != address => warn!(
                "⚠️  Vault key belongs to {:?} but {:?} is on record",
                address, recorded
            ),
            Some(_) => {}
            None => self.write_local(main, address).await?,
        }

        let mut state = self.state.write().await;
        state.address = Some(address);
        state.signer = Some(signer.clone());
        info!("🔓 Session wallet {:?} loaded from vault", address);
        Ok(signer)
    }

    /// In-memory key, else a vault retrieval.
    pub async fn get_private_key(&self) -> Result<String, VaultError> {
        let signer = self.ensure_wallet_loaded().await?;
        Ok(format!("0x{}", hex::encode(signer.signer().to_bytes())))
    }

    pub async fn ensure_wallet_loaded(&self) -> Result<LocalWallet, VaultError> {
        if let Some(signer) = self.state.read().await.signer.clone() {
            return Ok(signer);
        }
        let _op = self.op.lock().await;
        if let Some(signer) = self.state.read().await.signer.clone() {
            return Ok(signer);
        }
        self.retrieve_locked().await
    }

    // ---- signing ----

    async fn sign_and_confirm(&self, tx: TxRequest) -> Result<TransactionReceipt, VaultError> {
        let hash = self.sign_and_submit(tx).await?;
        let network = self.network.current().await;
        Ok(confirm(self.chain(network)?.as_ref(), hash, self.receipts).await?)
    }

    async fn sign_and_submit(&self, tx: TxRequest) -> Result<H256, VaultError> {
        let signer = self.ensure_wallet_loaded().await?;
        let network = self.network.current().await;
        let chain = self.chain(network)?;
        Ok(sign_and_send(chain.as_ref(), &signer, &tx).await?)
    }

    /// `amount` is decimal ether, e.g. `"0.01"`.
    pub async fn send_eth(&self, to: Address, amount: &str) -> Result<TransactionReceipt, VaultError> {
        let value = parse_ether(amount).map_err(|e| VaultError::InvalidAmount(e.to_string()))?;
        info!("💸 Sending {} ETH to {:?}", amount, to);
        let receipt = self.sign_and_confirm(TxRequest::transfer(to, value)).await?;
        if let Err(e) = self.refresh_balance().await {
            debug!("Balance refresh after transfer failed: {}", e);
        }
        Ok(receipt)
    }

    pub async fn sign_transaction(&self, tx: TxRequest) -> Result<TransactionReceipt, VaultError> {
        self.sign_and_confirm(tx).await
    }

    pub async fn call_contract(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_limit: Option<u64>,
    ) -> Result<TransactionReceipt, VaultError> {
        let mut tx = TxRequest::call(to, data).with_value(value);
        if let Some(limit) = gas_limit {
            tx = tx.with_gas(limit);
        }
        self.sign_and_confirm(tx).await
    }

    // ---- reconciliation ----

    /// Read-only comparison of the local record with the vault. The network
    /// comes from the wallet's own chain id, not from cached state.
    pub async fn sync_with_blockchain(&self) -> Result<Option<Address>, VaultError> {
        let _op = self.op.lock().await;
        self.state.write().await.syncing = true;
        let result = self.sync_locked().await;
        {
            let mut state = self.state.write().await;
            state.syncing = false;
            if result.is_ok() {
                state.synced = true;
            }
        }
        if let Ok(address) = &result {
            self.emit(CustodianEvent::SyncCompleted { address: *address });
        }
        result
    }

    async fn sync_locked(&self) -> Result<Option<Address>, VaultError> {
        let wallet = self.session.wallet().await?;
        let network = Network::resolve(wallet.chain_id().await?);
        let vault = self.vault_for(network)?;
        let main = wallet.primary_account().await?;

        let has: HasKeyReturn = self
            .view(network, vault, HasKeyCall { owner: main }.encode(), main, "hasKey")
            .await?;
        let local = self.read_local(main).await?;

        if !has.0 {
            if local.is_some() {
                info!("Vault holds no key for {:?}, dropping stale record", main);
                self.store
                    .remove(&self.storage_key(main))
                    .await
                    .map_err(VaultError::storage)?;
            }
            let mut state = self.state.write().await;
            state.address = None;
            state.signer = None;
            state.balance = None;
            return Ok(None);
        }

        let on_chain: GetSessionWalletReturn = self
            .view(
                network,
                vault,
                GetSessionWalletCall { owner: main }.encode(),
                main,
                "getSessionWallet",
            )
            .await?;
        let address = on_chain.0;
        if address.is_zero() {
            info!("Vault reports no session wallet for {:?}", main);
            return Ok(None);
        }
        if local != Some(address) {
            info!("🔄 Session wallet record updated to {:?}", address);
            self.write_local(main, address).await?;
        }

        let mut state = self.state.write().await;
        if state.signer.as_ref().map(|s| s.address()) != Some(address) {
            state.signer = None;
        }
        state.address = Some(address);
        Ok(Some(address))
    }

    /// Local clearing always happens; `clearKey` on chain is best-effort.
    pub async fn clear_wallet(&self, clear_on_chain: bool) -> Result<(), VaultError> {
        let _op = self.op.lock().await;
        self.stop_balance_polling().await;
        *self.state.write().await = CustodianState::default();

        let main = match self.main_account().await {
            Ok(main) => main,
            Err(e) => {
                warn!("No main account, only in-memory state cleared: {}", e);
                self.emit(CustodianEvent::Cleared);
                return Ok(());
            }
        };
        self.store
            .remove(&self.storage_key(main))
            .await
            .map_err(VaultError::storage)?;
        info!("🗑️  Session wallet record cleared");

        if clear_on_chain {
            if let Err(e) = self.clear_on_chain(main).await {
                warn!("⚠️  clearKey failed, vault entry left in place: {}", e);
            }
        }
        self.emit(CustodianEvent::Cleared);
        Ok(())
    }

    async fn clear_on_chain(&self, main: Address) -> Result<(), VaultError> {
        let network = self.network.current().await;
        let vault = self.vault_for(network)?;
        let wallet = self.session.wallet().await?;
        let tx = TxRequest::call(vault, ClearKeyCall.encode()).with_gas(self.settings.clear_gas_limit);
        let hash = wallet.send_transaction(main, &tx).await?;
        confirm(self.chain(network)?.as_ref(), hash, self.receipts).await?;
        Ok(())
    }

    // ---- status ----

    pub async fn has_wallet(&self) -> bool {
        self.state.read().await.address.is_some()
    }

    pub async fn address(&self) -> Option<Address> {
        self.state.read().await.address
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.signer.is_some()
    }

    pub async fn is_syncing(&self) -> bool {
        self.state.read().await.syncing
    }

    pub async fn is_synced(&self) -> bool {
        self.state.read().await.synced
    }

    pub async fn balance(&self) -> Option<String> {
        self.state.read().await.balance.clone()
    }

    pub async fn refresh_balance(&self) -> Result<String, VaultError> {
        let address = self
            .state
            .read()
            .await
            .address
            .ok_or(VaultError::WalletNotLoaded)?;
        let network = self.network.current().await;
        let wei = self.chain(network)?.balance(address).await?;
        let balance = format_eth(wei);

        let changed = {
            let mut state = self.state.write().await;
            let changed = state.balance.as_deref() != Some(balance.as_str());
            state.balance = Some(balance.clone());
            changed
        };
        if changed {
            debug!("Session wallet balance: {} ETH", balance);
            self.emit(CustodianEvent::BalanceChanged {
                balance: balance.clone(),
            });
        }
        Ok(balance)
    }

    pub async fn start_balance_polling(&self) {
        let mut poller = self.poller.lock().await;
        if poller.is_some() {
            return;
        }
        let this = self.clone();
        let period = Duration::from_secs(self.settings.balance_poll_secs.max(1));
        *poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = this.refresh_balance().await {
                    debug!("Balance poll skipped: {}", e);
                }
            }
        }));
        debug!("Balance polling every {:?}", period);
    }

    pub async fn stop_balance_polling(&self) {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
    }
}

/// Wei to an ether string truncated to 4 decimals.
pub fn format_eth(wei: U256) -> String {
    let unit = U256::exp10(18);
    let whole = wei / unit;
    let frac = (wei % unit) / U256::exp10(14);
    format!("{}.{:04}", whole, frac.low_u64())
}

fn vault_to_game(err: VaultError) -> GameError {
    if err.is_user_rejection() {
        GameError::UserRejected
    } else {
        GameError::Submit(err.to_string())
    }
}

/// Gameplay transactions signed by the session wallet: no main-wallet
/// prompt per move.
#[async_trait]
impl TxSubmitter for SessionWalletCustodian {
    async fn sender(&self) -> Result<Address, GameError> {
        self.ensure_wallet_loaded()
            .await
            .map(|signer| signer.address())
            .map_err(vault_to_game)
    }

    async fn submit(&self, tx: TxRequest) -> Result<H256, GameError> {
        self.sign_and_submit(tx).await.map_err(vault_to_game)
    }
}
