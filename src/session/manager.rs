// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::record::{SessionAuthorization, SessionRecord, StoredSession, MS_PER_DAY};
use super::SessionError;
use crate::clock::Clock;
use crate::config::SessionSettings;
use crate::crypto::{
    fallback_keypair, handle_to_hex, ClearType, CryptoError, FheBackend, FheBackends, KeyMaterial,
    PinEnvelope, PublicDecryptResult, SessionKeypair, UserDecryptRequest,
};
use crate::network::NetworkContext;
use crate::storage::KeyValueStore;
use crate::wallet::WalletProvider;
use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of [`SessionKeyManager::initialize_session`].
#[derive(Debug, Clone)]
pub struct SessionInit {
    pub public_key: KeyMaterial,
    pub signature: String,
    pub from_cache: bool,
}

/// Public view of the active session, safe to print.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub contracts: Vec<Address>,
    pub start_timestamp: Option<String>,
    pub duration_days: Option<String>,
    pub expiry_ms: Option<i64>,
    pub signature_prefix: String,
    pub valid: bool,
}

#[derive(Default)]
struct SessionState {
    keypair: Option<SessionKeypair>,
    authorization: Option<SessionAuthorization>,
    initialized: bool,
}

impl SessionState {
    fn is_valid(&self, now_ms: i64) -> bool {
        match (&self.keypair, &self.authorization) {
            (Some(_), Some(auth)) => self.initialized && !auth.is_expired(now_ms),
            _ => false,
        }
    }

    fn load(&mut self, record: &SessionRecord) {
        self.keypair = Some(record.keypair());
        self.authorization = record.authorization();
        self.initialized = self.authorization.is_some();
    }

    fn commit(&mut self, keypair: SessionKeypair, auth: SessionAuthorization) {
        self.keypair = Some(keypair);
        self.authorization = Some(auth);
        self.initialized = true;
    }
}

enum Persist<'a> {
    Plain,
    Sealed(&'a str),
}

/// Owns the session decryption keypair and its wallet-signed authorization.
///
/// Everything that changes the session (initialize, refresh, escalate,
/// clear) holds the write side of `gate` until persistence is done. Decrypts
/// hold the read side, so they never observe a half-written session.
pub struct SessionKeyManager {
    store: Arc<dyn KeyValueStore>,
    wallet: RwLock<Option<Arc<dyn WalletProvider>>>,
    backends: FheBackends,
    network: NetworkContext,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    state: RwLock<SessionState>,
    gate: RwLock<()>,
}

impl SessionKeyManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        wallet: Option<Arc<dyn WalletProvider>>,
        backends: FheBackends,
        network: NetworkContext,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            wallet: RwLock::new(wallet),
            backends,
            network,
            clock,
            settings,
            state: RwLock::new(SessionState::default()),
            gate: RwLock::new(()),
        }
    }

    pub async fn set_wallet(&self, wallet: Option<Arc<dyn WalletProvider>>) {
        *self.wallet.write().await = wallet;
    }

    pub async fn wallet(&self) -> Result<Arc<dyn WalletProvider>, SessionError> {
        self.wallet
            .read()
            .await
            .clone()
            .ok_or(SessionError::NoWalletProvider)
    }

    pub fn network(&self) -> &NetworkContext {
        &self.network
    }

    pub fn backends(&self) -> &FheBackends {
        &self.backends
    }

    async fn backend(&self) -> Result<Arc<dyn FheBackend>, CryptoError> {
        let network = self.network.current().await;
        self.backends.select(network)
    }

    async fn new_keypair(&self) -> Result<SessionKeypair, SessionError> {
        match self.backend().await {
            Ok(backend) => Ok(backend.generate_keypair().await?),
            Err(e) => {
                warn!(
                    "⚠️  {}; using local fallback keypair (mock networks only)",
                    e
                );
                Ok(fallback_keypair())
            }
        }
    }

    /// Replaces the in-memory keypair. Any in-memory authorization was signed
    /// over the old public key, so it is dropped; the persisted record stays
    /// until a new authorization overwrites it.
    pub async fn generate_keypair(&self) -> Result<SessionKeypair, SessionError> {
        let _gate = self.gate.write().await;
        let keypair = self.new_keypair().await?;
        let mut state = self.state.write().await;
        state.keypair = Some(keypair.clone());
        state.authorization = None;
        state.initialized = false;
        info!("🔑 Session keypair generated");
        Ok(keypair)
    }

    /// Signs an authorization for the in-memory keypair and persists it.
    /// Returns the signature.
    pub async fn create_authorization(&self, contracts: &[Address]) -> Result<String, SessionError> {
        let _gate = self.gate.write().await;
        let keypair = self
            .state
            .read()
            .await
            .keypair
            .clone()
            .ok_or(SessionError::NoKeypair)?;
        let auth = self.authorize(&keypair, contracts).await?;
        self.persist(&keypair, &auth, Persist::Plain).await?;
        let signature = auth.signature.clone();
        self.state.write().await.commit(keypair, auth);
        Ok(signature)
    }

    /// One wallet prompt. Fixes `startTimestamp`/`durationDays` now and keeps
    /// the exact strings for every later decrypt.
    async fn authorize(
        &self,
        keypair: &SessionKeypair,
        contracts: &[Address],
    ) -> Result<SessionAuthorization, SessionError> {
        let wallet = self.wallet().await?;
        let account = wallet.primary_account().await?;
        let chain_id = wallet.chain_id().await?;

        let backend = match self.backend().await {
            Ok(backend) => backend,
            Err(_) => self.backends.mock(),
        };

        let start_secs = self.clock.now_secs();
        let start_timestamp = start_secs.to_string();
        let duration_days = self.settings.duration_days.to_string();
        let typed = backend.create_eip712(
            &keypair.public_key,
            contracts,
            &start_timestamp,
            &duration_days,
            chain_id,
        )?;

        info!(
            "✍️  Requesting session signature from {:?} (chain {}, {} contract(s))",
            account,
            chain_id,
            contracts.len()
        );
        let signature = wallet.sign_typed_data(account, &typed).await.map_err(|e| {
            if e.is_user_rejection() {
                info!("Session signature declined by user");
            }
            SessionError::from(e)
        })?;

        let start_time_ms = start_secs * 1000;
        let expiry_ms = start_time_ms + i64::from(self.settings.duration_days) * MS_PER_DAY;
        let auth = SessionAuthorization {
            signature: format!("0x{}", signature),
            contracts: contracts.to_vec(),
            start_time_ms,
            expiry_ms: Some(expiry_ms),
            start_timestamp: Some(start_timestamp),
            duration_days: Some(duration_days),
        };
        info!(
            "✅ Session authorized ({}...), expires at {}",
            auth.signature_prefix(),
            expiry_ms
        );
        Ok(auth)
    }

    async fn persist(
        &self,
        keypair: &SessionKeypair,
        auth: &SessionAuthorization,
        mode: Persist<'_>,
    ) -> Result<(), SessionError> {
        let record = SessionRecord::new(keypair, auth);
        let json = record.to_json()?;
        let value = match mode {
            Persist::Plain => json,
            Persist::Sealed(pin) => {
                let envelope = PinEnvelope::seal(&json, pin, auth.expiry_ms)?;
                serde_json::to_string(&envelope)
                    .map_err(|e| SessionError::InvalidRecord(e.to_string()))?
            }
        };
        self.store
            .set(&self.settings.storage_key, &value)
            .await
            .map_err(SessionError::storage)?;
        debug!("Session record persisted under {}", self.settings.storage_key);
        Ok(())
    }

    async fn remove_stored(&self) -> Result<(), SessionError> {
        self.store
            .remove(&self.settings.storage_key)
            .await
            .map_err(SessionError::storage)
    }

    async fn read_stored(&self) -> Result<Option<StoredSession>, SessionError> {
        let raw = match self
            .store
            .get(&self.settings.storage_key)
            .await
            .map_err(SessionError::storage)?
        {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match StoredSession::parse(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!("Discarding unreadable session record: {}", e);
                self.remove_stored().await?;
                Ok(None)
            }
        }
    }

    /// Expiry and key-format checks, then load into memory. Records failing
    /// either check are removed.
    async fn adopt_record(&self, record: SessionRecord) -> Result<bool, SessionError> {
        if record.is_expired(self.clock.now_ms()) {
            info!("Stored session expired, clearing");
            self.remove_stored().await?;
            return Ok(false);
        }
        if !record.has_valid_key_format() {
            warn!("⚠️  Stored session has a legacy key format, clearing");
            self.remove_stored().await?;
            return Ok(false);
        }
        self.state.write().await.load(&record);
        Ok(true)
    }

    async fn cached(&self, contracts: &[Address]) -> Option<SessionInit> {
        let state = self.state.read().await;
        if !state.is_valid(self.clock.now_ms()) {
            return None;
        }
        let (keypair, auth) = match (&state.keypair, &state.authorization) {
            (Some(k), Some(a)) => (k, a),
            _ => return None,
        };
        if !auth.covers_all(contracts) {
            debug!(
                "Session valid but missing required contracts (has {:?}, needs {:?})",
                auth.contracts, contracts
            );
            return None;
        }
        Some(SessionInit {
            public_key: keypair.public_key.clone(),
            signature: auth.signature.clone(),
            from_cache: true,
        })
    }

    async fn create_new(
        &self,
        contracts: &[Address],
        mode: Persist<'_>,
    ) -> Result<SessionInit, SessionError> {
        info!("🆕 Creating new session for {} contract(s)", contracts.len());
        let keypair = self.new_keypair().await?;
        let auth = self.authorize(&keypair, contracts).await?;
        self.persist(&keypair, &auth, mode).await?;

        let init = SessionInit {
            public_key: keypair.public_key.clone(),
            signature: auth.signature.clone(),
            from_cache: false,
        };
        self.state.write().await.commit(keypair, auth);
        Ok(init)
    }

    async fn initialize_locked(
        &self,
        contracts: &[Address],
        force_new: bool,
    ) -> Result<SessionInit, SessionError> {
        if !force_new {
            if let Some(init) = self.cached(contracts).await {
                debug!("Using session from memory");
                return Ok(init);
            }
            match self.read_stored().await? {
                Some(StoredSession::Plain(record)) => {
                    if self.adopt_record(record).await? {
                        if let Some(init) = self.cached(contracts).await {
                            info!("♻️  Using stored session");
                            return Ok(init);
                        }
                    }
                }
                Some(StoredSession::Sealed(_)) => {
                    debug!("Stored session is PIN-sealed, not usable without PIN");
                }
                None => {}
            }
        }
        // The previous record is only overwritten once the new one is signed.
        self.create_new(contracts, Persist::Plain).await
    }

    /// Memory, then storage, then a fresh keypair and one signature prompt.
    pub async fn initialize_session(
        &self,
        contracts: &[Address],
    ) -> Result<SessionInit, SessionError> {
        let _gate = self.gate.write().await;
        self.initialize_locked(contracts, false).await
    }

    /// Always prompts. A declined prompt leaves the previous session intact.
    pub async fn refresh_session(&self, contracts: &[Address]) -> Result<SessionInit, SessionError> {
        let _gate = self.gate.write().await;
        self.initialize_locked(contracts, true).await
    }

    /// Same flow as [`initialize_session`](Self::initialize_session) but the
    /// record is stored sealed under `pin`.
    pub async fn initialize_session_with_pin(
        &self,
        contracts: &[Address],
        pin: &str,
    ) -> Result<SessionInit, SessionError> {
        let _gate = self.gate.write().await;
        if let Some(init) = self.cached(contracts).await {
            return Ok(init);
        }

        let loaded = match self.read_stored().await? {
            Some(StoredSession::Sealed(envelope)) => {
                if envelope.is_expired(self.clock.now_ms()) {
                    info!("Sealed session expired, clearing");
                    self.remove_stored().await?;
                    false
                } else {
                    let json = envelope.open(pin).map_err(|e| match e {
                        CryptoError::DecryptionFailed { .. } => SessionError::WrongPin,
                        other => SessionError::Backend(other),
                    })?;
                    let record: SessionRecord = serde_json::from_str(&json)
                        .map_err(|e| SessionError::InvalidRecord(e.to_string()))?;
                    self.adopt_record(record).await?
                }
            }
            Some(StoredSession::Plain(record)) => self.adopt_record(record).await?,
            None => false,
        };
        if loaded {
            if let Some(init) = self.cached(contracts).await {
                info!("🔓 Session unlocked with PIN");
                return Ok(init);
            }
        }
        self.create_new(contracts, Persist::Sealed(pin)).await
    }

    /// Clears the session and signs a new one for `contracts`.
    pub async fn escalate(&self, contracts: &[Address]) -> Result<SessionInit, SessionError> {
        let _gate = self.gate.write().await;
        info!(
            "⬆️  Re-authorizing session for {} contract(s)",
            contracts.len()
        );
        self.clear_locked().await?;
        self.create_new(contracts, Persist::Plain).await
    }

    pub async fn decrypt(
        &self,
        handles: &[H256],
        contract: Address,
    ) -> Result<Vec<U256>, SessionError> {
        self.decrypt_as(handles, contract, ClearType::Uint16).await
    }

    /// Owner-only decrypt, values in `handles` order.
    pub async fn decrypt_as(
        &self,
        handles: &[H256],
        contract: Address,
        clear_type: ClearType,
    ) -> Result<Vec<U256>, SessionError> {
        let _gate = self.gate.read().await;

        let (keypair, auth) = {
            let state = self.state.read().await;
            if !state.is_valid(self.clock.now_ms()) {
                return Err(SessionError::SessionInvalid);
            }
            match (&state.keypair, &state.authorization) {
                (Some(k), Some(a)) => (k.clone(), a.clone()),
                _ => return Err(SessionError::SessionInvalid),
            }
        };
        let (start_timestamp, duration_days) =
            match (auth.start_timestamp.clone(), auth.duration_days.clone()) {
                (Some(start), Some(days)) => (start, days),
                _ => {
                    warn!("Session parameters missing; clear the session and reconnect");
                    return Err(SessionError::ParamsMissing);
                }
            };
        if handles.is_empty() {
            return Ok(Vec::new());
        }

        let wallet = self.wallet().await?;
        let user = wallet.primary_account().await?;
        let chain_id = wallet.chain_id().await?;
        let backend = self.backend().await?;

        debug!(
            "Decrypting {} handle(s) for {:?} via {:?} backend (signature {}...)",
            handles.len(),
            contract,
            backend.kind(),
            auth.signature_prefix()
        );
        let request = UserDecryptRequest {
            handles: handles.to_vec(),
            contract,
            clear_type,
            keypair,
            signature: auth.signature.trim_start_matches("0x").to_string(),
            contracts: auth.contracts.clone(),
            user,
            chain_id,
            start_timestamp,
            duration_days,
        };
        let results = backend.user_decrypt(&request).await?;

        handles
            .iter()
            .map(|handle| {
                results.get(handle).copied().ok_or_else(|| {
                    warn!("No clear value returned for handle {}", handle_to_hex(handle));
                    SessionError::MissingValue {
                        handle: handle_to_hex(handle),
                    }
                })
            })
            .collect()
    }

    /// Threshold decrypt; needs no session.
    pub async fn public_decrypt(
        &self,
        handles: &[H256],
    ) -> Result<PublicDecryptResult, SessionError> {
        let backend = self.backend().await?;
        Ok(backend.public_decrypt(handles).await?)
    }

    pub async fn is_session_valid(&self) -> bool {
        self.state.read().await.is_valid(self.clock.now_ms())
    }

    async fn clear_locked(&self) -> Result<(), SessionError> {
        *self.state.write().await = SessionState::default();
        self.remove_stored().await?;
        info!("🗑️  Session cleared");
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<(), SessionError> {
        let _gate = self.gate.write().await;
        self.clear_locked().await
    }

    pub async fn covers(&self, contract: Address) -> bool {
        self.state
            .read()
            .await
            .authorization
            .as_ref()
            .map(|auth| auth.covers(contract))
            .unwrap_or(false)
    }

    pub async fn authorized_contracts(&self) -> Vec<Address> {
        self.state
            .read()
            .await
            .authorization
            .as_ref()
            .map(|auth| auth.contracts.clone())
            .unwrap_or_default()
    }

    /// A non-expired v1 or v2 record exists. Never prompts and never needs
    /// the PIN.
    pub async fn has_stored_session(&self) -> Result<bool, SessionError> {
        let raw = self
            .store
            .get(&self.settings.storage_key)
            .await
            .map_err(SessionError::storage)?;
        Ok(raw
            .and_then(|raw| StoredSession::parse(&raw).ok())
            .map(|stored| !stored.is_expired(self.clock.now_ms()))
            .unwrap_or(false))
    }

    pub async fn session_info(&self) -> Option<SessionInfo> {
        let state = self.state.read().await;
        let valid = state.is_valid(self.clock.now_ms());
        state.authorization.as_ref().map(|auth| SessionInfo {
            contracts: auth.contracts.clone(),
            start_timestamp: auth.start_timestamp.clone(),
            duration_days: auth.duration_days.clone(),
            expiry_ms: auth.expiry_ms,
            signature_prefix: auth.signature_prefix().to_string(),
            valid,
        })
    }

    pub async fn public_key(&self) -> Option<KeyMaterial> {
        self.state
            .read()
            .await
            .keypair
            .as_ref()
            .map(|k| k.public_key.clone())
    }
}
