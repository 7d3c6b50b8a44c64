// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::contract::{
    AttackCall, CompleteMulliganCall, CreateGameCall, CreateSinglePlayerGameCall, EndTurnCall,
    GetBoardUnitCall, GetBoardUnitReturn, GetCardFromDeckCall, GetCardFromDeckReturn,
    GetGameStateCall, GetGameStateReturn, GetHandCall, GetHandReturn, GetPlayerInfoCall,
    GetPlayerInfoReturn, JoinGameCall, MoveUnitCall, PlayCardCall, ReplaceCardCall, ResignCall,
};
use super::deck::{prepare_deck, DECK_SIZE, INITIAL_HAND_SIZE, MAX_HAND_SIZE, MULLIGAN_SLOTS};
use super::events::{decode_logs, GameEvent};
use super::types::{BoardUnit, GameStateView, GameStatus, PlayerInfo};
use super::GameError;
use crate::chain::{confirm, logs_from, ChainClient, ChainClients, ReceiptPolicy, TxRequest};
use crate::clock::Clock;
use crate::config::{ChainRegistry, GameSettings};
use crate::crypto::{handle_from_u256, handle_to_hex, EncryptedInput, FheBackends};
use crate::network::NetworkContext;
use crate::session::SessionKeyManager;
use crate::wallet::{WalletError, WalletProvider};
use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::types::{Address, BlockNumber, Filter, TransactionReceipt, H256, U256};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Whoever signs and pays for game transactions.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn sender(&self) -> Result<Address, GameError>;

    async fn submit(&self, tx: TxRequest) -> Result<H256, GameError>;
}

/// Submits through the main wallet's `eth_sendTransaction`.
pub struct MainWalletSubmitter {
    wallet: Arc<dyn WalletProvider>,
}

impl MainWalletSubmitter {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self { wallet }
    }
}

fn wallet_to_game(err: WalletError) -> GameError {
    match err {
        WalletError::UserRejected => GameError::UserRejected,
        other => GameError::Submit(other.to_string()),
    }
}

#[async_trait]
impl TxSubmitter for MainWalletSubmitter {
    async fn sender(&self) -> Result<Address, GameError> {
        self.wallet.primary_account().await.map_err(wallet_to_game)
    }

    async fn submit(&self, tx: TxRequest) -> Result<H256, GameError> {
        let from = self.sender().await?;
        self.wallet
            .send_transaction(from, &tx)
            .await
            .map_err(wallet_to_game)
    }
}

type SharedDecrypt = Shared<BoxFuture<'static, Result<u16, GameError>>>;

struct LocalGame {
    status: GameStatus,
    contract: Option<Address>,
    game_id: Option<U256>,
    /// Index-aligned with `handles`; `None` until decrypted.
    hand: Vec<Option<u16>>,
    handles: Vec<H256>,
    deck_cursor: usize,
}

impl LocalGame {
    fn new() -> Self {
        Self {
            status: GameStatus::Disconnected,
            contract: None,
            game_id: None,
            hand: Vec::new(),
            handles: Vec::new(),
            deck_cursor: INITIAL_HAND_SIZE,
        }
    }

    fn reset_game(&mut self) {
        self.game_id = None;
        self.hand.clear();
        self.handles.clear();
        self.deck_cursor = INITIAL_HAND_SIZE;
    }
}

/// Which creation flow is running, and the event that proves it landed.
enum Entry {
    Create,
    SinglePlayer(U256),
    Join(U256),
}

impl Entry {
    fn status(&self) -> GameStatus {
        match self {
            Entry::Join(_) => GameStatus::Joining,
            _ => GameStatus::Creating,
        }
    }

    fn expected_event(&self) -> &'static str {
        match self {
            Entry::Join(_) => "PlayerJoined",
            _ => "GameCreated",
        }
    }
}

/// Client for one on-chain GameSession contract.
///
/// Hand state lives locally and is rebuilt from the contract after every
/// hand-mutating transaction. Draws never send a transaction: the client
/// reads the next encrypted deck cell and decrypts it with the session key.
#[derive(Clone)]
pub struct GameSessionClient {
    session: Arc<SessionKeyManager>,
    backends: FheBackends,
    chains: ChainClients,
    network: NetworkContext,
    registry: ChainRegistry,
    settings: GameSettings,
    clock: Arc<dyn Clock>,
    submitter: Arc<RwLock<Option<Arc<dyn TxSubmitter>>>>,
    state: Arc<RwLock<LocalGame>>,
    op: Arc<Mutex<()>>,
    pending: Arc<Mutex<HashMap<usize, SharedDecrypt>>>,
}

impl GameSessionClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<SessionKeyManager>,
        backends: FheBackends,
        chains: ChainClients,
        network: NetworkContext,
        registry: ChainRegistry,
        settings: GameSettings,
        clock: Arc<dyn Clock>,
        submitter: Option<Arc<dyn TxSubmitter>>,
    ) -> Self {
        Self {
            session,
            backends,
            chains,
            network,
            registry,
            settings,
            clock,
            submitter: Arc::new(RwLock::new(submitter)),
            state: Arc::new(RwLock::new(LocalGame::new())),
            op: Arc::new(Mutex::new(())),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn set_submitter(&self, submitter: Arc<dyn TxSubmitter>) {
        *self.submitter.write().await = Some(submitter);
    }

    async fn submitter(&self) -> Result<Arc<dyn TxSubmitter>, GameError> {
        self.submitter
            .read()
            .await
            .clone()
            .ok_or_else(|| GameError::Submit("no transaction submitter configured".to_string()))
    }

    async fn chain(&self) -> Result<Arc<dyn ChainClient>, GameError> {
        let network = self.network.current().await;
        Ok(self.chains.get(network)?)
    }

    fn receipt_policy(&self) -> ReceiptPolicy {
        ReceiptPolicy {
            interval: self.settings.receipt_poll_interval(),
            max_attempts: self.settings.receipt_max_attempts,
        }
    }

    // ---- state machine ----

    /// Binds the GameSession contract of the current network.
    pub async fn connect(&self) -> Result<Address, GameError> {
        let network = self.network.current().await;
        let contract = self
            .registry
            .game_session(network)
            .ok_or(GameError::NotConnected)?;
        self.connect_to(contract).await;
        Ok(contract)
    }

    pub async fn connect_to(&self, contract: Address) {
        let mut state = self.state.write().await;
        state.reset_game();
        state.contract = Some(contract);
        state.status = GameStatus::Connected;
        info!("🎮 Game client bound to {:?}", contract);
    }

    /// Terminal: drops the contract binding and every local cache.
    pub async fn disconnect(&self) {
        let _op = self.op.lock().await;
        self.pending.lock().await.clear();
        let mut state = self.state.write().await;
        state.reset_game();
        state.contract = None;
        state.status = GameStatus::Disconnected;
        info!("Game client disconnected");
    }

    pub async fn status(&self) -> GameStatus {
        self.state.read().await.status
    }

    pub async fn contract(&self) -> Option<Address> {
        self.state.read().await.contract
    }

    pub async fn game_id(&self) -> Option<U256> {
        self.state.read().await.game_id
    }

    pub async fn hand(&self) -> Vec<Option<u16>> {
        self.state.read().await.hand.clone()
    }

    pub async fn handles(&self) -> Vec<H256> {
        self.state.read().await.handles.clone()
    }

    pub async fn deck_cursor(&self) -> usize {
        self.state.read().await.deck_cursor
    }

    pub async fn remaining_deck(&self) -> usize {
        DECK_SIZE.saturating_sub(self.state.read().await.deck_cursor)
    }

    async fn bound_contract(&self) -> Result<Address, GameError> {
        self.state
            .read()
            .await
            .contract
            .ok_or(GameError::NotConnected)
    }

    async fn active(&self) -> Result<(Address, U256), GameError> {
        let state = self.state.read().await;
        let contract = state.contract.ok_or(GameError::NotConnected)?;
        match (state.status, state.game_id) {
            (GameStatus::InGame, Some(id)) => Ok((contract, id)),
            _ => Err(GameError::NotInGame),
        }
    }

    // ---- transport ----

    async fn view<R: AbiDecode>(
        &self,
        contract: Address,
        data: Vec<u8>,
        what: &str,
    ) -> Result<R, GameError> {
        let chain = self.chain().await?;
        let from = match self.submitter.read().await.clone() {
            Some(submitter) => submitter.sender().await.ok(),
            None => None,
        };
        let out = chain.call(contract, data.into(), from).await?;
        R::decode(out.as_ref()).map_err(|e| GameError::Decode(format!("{}: {}", what, e)))
    }

    /// Submit, poll for the receipt, then fold any GameEnded into local
    /// state. Reverts and timeouts are returned, never retried.
    async fn send(
        &self,
        contract: Address,
        data: Vec<u8>,
        gas_limit: u64,
    ) -> Result<TransactionReceipt, GameError> {
        let submitter = self.submitter().await?;
        let tx = TxRequest::call(contract, data).with_gas(gas_limit);
        let hash = submitter.submit(tx).await?;
        debug!("Submitted {:?}, waiting for receipt", hash);

        let chain = self.chain().await?;
        let receipt = confirm(chain.as_ref(), hash, self.receipt_policy()).await?;
        self.observe(&receipt, contract).await;
        Ok(receipt)
    }

    async fn observe(&self, receipt: &TransactionReceipt, contract: Address) {
        let events = decode_logs(logs_from(receipt, contract));
        let mut state = self.state.write().await;
        for event in events {
            if let GameEvent::GameEnded { game_id, winner } = event {
                if state.game_id == Some(game_id) {
                    info!("🏁 Game {} ended, winner {:?}", game_id, winner);
                    state.status = GameStatus::Ended;
                }
            }
        }
    }

    // ---- creation ----

    pub async fn create_game(&self, general_id: u16, deck: &[u16]) -> Result<U256, GameError> {
        self.enter(Entry::Create, general_id, deck).await
    }

    /// Single-player games take a client-chosen id (current time in ms).
    pub async fn create_single_player_game(
        &self,
        general_id: u16,
        deck: &[u16],
    ) -> Result<U256, GameError> {
        let game_id = U256::from(self.clock.now_ms().max(0) as u64);
        self.enter(Entry::SinglePlayer(game_id), general_id, deck)
            .await
    }

    pub async fn join_game(
        &self,
        game_id: U256,
        general_id: u16,
        deck: &[u16],
    ) -> Result<U256, GameError> {
        self.enter(Entry::Join(game_id), general_id, deck).await
    }

    async fn enter(&self, entry: Entry, general_id: u16, deck: &[u16]) -> Result<U256, GameError> {
        let _op = self.op.lock().await;
        let contract = {
            let mut state = self.state.write().await;
            let contract = state.contract.ok_or(GameError::NotConnected)?;
            if !matches!(state.status, GameStatus::Connected | GameStatus::Ended) {
                return Err(GameError::InvalidState {
                    operation: entry.expected_event().to_string(),
                    state: state.status.to_string(),
                });
            }
            state.status = entry.status();
            contract
        };

        match self.submit_entry(&entry, contract, general_id, deck).await {
            Ok(game_id) => {
                self.pending.lock().await.clear();
                let mut state = self.state.write().await;
                state.reset_game();
                state.game_id = Some(game_id);
                state.status = GameStatus::InGame;
                info!("✅ In game {} on {:?}", game_id, contract);
                Ok(game_id)
            }
            Err(e) => {
                warn!("❌ {} failed: {}", entry.expected_event(), e);
                self.state.write().await.status = GameStatus::Connected;
                Err(e)
            }
        }
    }

    async fn submit_entry(
        &self,
        entry: &Entry,
        contract: Address,
        general_id: u16,
        deck: &[u16],
    ) -> Result<U256, GameError> {
        let sender = self.submitter().await?.sender().await?;
        let shuffled = prepare_deck(deck);

        let input = shuffled
            .iter()
            .fold(EncryptedInput::new(contract, sender), |input, card| {
                input.add16(*card)
            });
        let backend = self.backends.select(self.network.current().await)?;
        let payload = backend.encrypt(&input).await?;
        info!(
            "🔒 Encrypted {}-card deck ({} byte proof)",
            payload.handles.len(),
            payload.input_proof.len()
        );

        let encrypted_deck: Vec<[u8; 32]> = payload.handles.iter().map(|h| h.0).collect();
        let general_card_id = U256::from(general_id);
        let data = match entry {
            Entry::Create => CreateGameCall {
                general_card_id,
                encrypted_deck,
                input_proof: payload.input_proof,
            }
            .encode(),
            Entry::SinglePlayer(game_id) => CreateSinglePlayerGameCall {
                game_id: *game_id,
                general_card_id,
                encrypted_deck,
                input_proof: payload.input_proof,
            }
            .encode(),
            Entry::Join(game_id) => JoinGameCall {
                game_id: *game_id,
                general_card_id,
                encrypted_deck,
                input_proof: payload.input_proof,
            }
            .encode(),
        };

        let receipt = self
            .send(contract, data, self.settings.create_gas_limit)
            .await?;

        // Only this contract's logs; ACL/executor contracts log into the same
        // receipt.
        let events = decode_logs(logs_from(&receipt, contract));
        let found = events.iter().find_map(|event| match (entry, event) {
            (Entry::Join(wanted), GameEvent::PlayerJoined { game_id, .. }) if game_id == wanted => {
                Some(*game_id)
            }
            (Entry::Create | Entry::SinglePlayer(_), GameEvent::GameCreated { game_id, .. }) => {
                Some(*game_id)
            }
            _ => None,
        });
        found.ok_or_else(|| GameError::EventNotFound {
            event: entry.expected_event().to_string(),
            hash: receipt.transaction_hash,
        })
    }

    // ---- hand ----

    /// Rebuilds hand and handle caches from the contract and batch-decrypts.
    pub async fn decrypt_hand(&self) -> Result<Vec<u16>, GameError> {
        let _op = self.op.lock().await;
        self.decrypt_hand_locked().await
    }

    async fn fetch_hand(&self, contract: Address, game_id: U256) -> Result<Vec<H256>, GameError> {
        let out: GetHandReturn = self
            .view(contract, GetHandCall { game_id }.encode(), "getHand")
            .await?;
        let size = out.hand_size as usize;
        let handles: Vec<H256> = out.handles.into_iter().take(size).map(H256::from).collect();
        debug!(
            "Hand handles: {:?}",
            handles.iter().map(handle_to_hex).collect::<Vec<_>>()
        );
        Ok(handles)
    }

    async fn decrypt_hand_locked(&self) -> Result<Vec<u16>, GameError> {
        let (contract, game_id) = self.active().await?;
        let handles = self.fetch_hand(contract, game_id).await?;

        let cards = if handles.is_empty() {
            Vec::new()
        } else {
            let values = self.session.decrypt(&handles, contract).await?;
            if values.len() != handles.len() {
                return Err(GameError::Decode(format!(
                    "hand decrypt returned {} of {} values",
                    values.len(),
                    handles.len()
                )));
            }
            values.iter().map(|v| v.low_u32() as u16).collect()
        };

        self.pending.lock().await.clear();
        let mut state = self.state.write().await;
        state.hand = cards.iter().copied().map(Some).collect();
        state.handles = handles;
        info!("🃏 Hand: {:?}", cards);
        Ok(cards)
    }

    /// Refreshes handles without decrypting. Slots whose handle did not
    /// change keep their known value; the rest become undecrypted.
    pub async fn sync_hand_handles(&self) -> Result<usize, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let handles = self.fetch_hand(contract, game_id).await?;

        self.pending.lock().await.clear();
        let mut state = self.state.write().await;
        let known: HashMap<H256, u16> = state
            .handles
            .iter()
            .zip(state.hand.iter())
            .filter_map(|(h, v)| v.map(|v| (*h, v)))
            .collect();
        state.hand = handles.iter().map(|h| known.get(h).copied()).collect();
        state.handles = handles;
        Ok(state.handles.len())
    }

    /// Lazily decrypts one slot. Concurrent callers for the same slot share
    /// a single decrypt request.
    pub async fn decrypt_card(&self, slot: usize) -> Result<u16, GameError> {
        let (contract, _) = self.active().await?;
        let handle = {
            let state = self.state.read().await;
            let size = state.handles.len();
            let handle = *state
                .handles
                .get(slot)
                .ok_or(GameError::SlotOutOfRange { slot, size })?;
            if let Some(Some(card)) = state.hand.get(slot) {
                return Ok(*card);
            }
            handle
        };

        let shared = {
            let mut pending = self.pending.lock().await;
            let session = self.session.clone();
            pending
                .entry(slot)
                .or_insert_with(|| {
                    let fut: BoxFuture<'static, Result<u16, GameError>> = async move {
                        let values = session.decrypt(&[handle], contract).await?;
                        values
                            .first()
                            .map(|v| v.low_u32() as u16)
                            .ok_or_else(|| GameError::Decode("empty decrypt result".to_string()))
                    }
                    .boxed();
                    fut.shared()
                })
                .clone()
        };

        let result = shared.await;
        self.pending.lock().await.remove(&slot);
        let card = result?;

        let mut state = self.state.write().await;
        if state.handles.get(slot) == Some(&handle) {
            if let Some(entry) = state.hand.get_mut(slot) {
                *entry = Some(card);
            }
        }
        Ok(card)
    }

    /// No transaction. `None` on a full hand (without touching the chain) or
    /// an exhausted deck.
    pub async fn draw_card(&self) -> Result<Option<u16>, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let cursor = {
            let state = self.state.read().await;
            if state.hand.len() >= MAX_HAND_SIZE {
                info!("Hand full ({}), no draw", state.hand.len());
                return Ok(None);
            }
            if state.deck_cursor >= DECK_SIZE {
                info!("💀 Fatigue: deck exhausted");
                return Ok(None);
            }
            state.deck_cursor
        };

        let out: GetCardFromDeckReturn = self
            .view(
                contract,
                GetCardFromDeckCall {
                    game_id,
                    index: cursor as u8,
                }
                .encode(),
                "getCardFromDeck",
            )
            .await?;
        let handle = H256::from(out.0);
        let values = self.session.decrypt(&[handle], contract).await?;
        let card = values
            .first()
            .map(|v| v.low_u32() as u16)
            .ok_or_else(|| GameError::Decode("empty decrypt result".to_string()))?;

        let mut state = self.state.write().await;
        state.hand.push(Some(card));
        state.handles.push(handle);
        state.deck_cursor = cursor + 1;
        info!("🃏 Drew card {} (deck index {})", card, cursor);
        Ok(Some(card))
    }

    /// Reveals the already-decrypted card in `slot` with a public-decrypt
    /// proof and plays it at (x, y).
    pub async fn play_card(&self, slot: usize, x: u8, y: u8) -> Result<u16, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let (card, handle) = {
            let state = self.state.read().await;
            let size = state.handles.len();
            let handle = *state
                .handles
                .get(slot)
                .ok_or(GameError::SlotOutOfRange { slot, size })?;
            let card = state
                .hand
                .get(slot)
                .copied()
                .flatten()
                .ok_or(GameError::NotDecryptedYet { slot })?;
            (card, handle)
        };

        let reveal = self.session.public_decrypt(&[handle]).await?;
        let call = PlayCardCall {
            game_id,
            hand_slot: slot as u8,
            card_id: card,
            decryption_proof: reveal.decryption_proof,
            x,
            y,
        };
        self.send(contract, call.encode(), self.settings.play_gas_limit)
            .await?;

        self.pending.lock().await.clear();
        let mut state = self.state.write().await;
        if slot < state.handles.len() {
            state.hand.remove(slot);
            state.handles.remove(slot);
        }
        info!("▶️  Played card {} from slot {} at ({}, {})", card, slot, x, y);
        Ok(card)
    }

    pub async fn complete_mulligan(
        &self,
        slots: [bool; MULLIGAN_SLOTS],
    ) -> Result<Vec<u16>, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let call = CompleteMulliganCall {
            game_id,
            mulligan_slots: slots,
        };
        self.send(contract, call.encode(), self.settings.action_gas_limit)
            .await?;
        self.decrypt_hand_locked().await
    }

    pub async fn replace_card(&self, slot: usize) -> Result<Vec<u16>, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let call = ReplaceCardCall {
            game_id,
            hand_slot: slot as u8,
        };
        self.send(contract, call.encode(), self.settings.action_gas_limit)
            .await?;
        self.decrypt_hand_locked().await
    }

    // ---- turn actions ----

    pub async fn end_turn(&self) -> Result<TransactionReceipt, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        self.send(
            contract,
            EndTurnCall { game_id }.encode(),
            self.settings.action_gas_limit,
        )
        .await
    }

    pub async fn resign(&self) -> Result<TransactionReceipt, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        self.send(
            contract,
            ResignCall { game_id }.encode(),
            self.settings.action_gas_limit,
        )
        .await
    }

    pub async fn move_unit(
        &self,
        from: (u8, u8),
        to: (u8, u8),
    ) -> Result<TransactionReceipt, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let call = MoveUnitCall {
            game_id,
            from_x: from.0,
            from_y: from.1,
            to_x: to.0,
            to_y: to.1,
        };
        self.send(contract, call.encode(), self.settings.action_gas_limit)
            .await
    }

    pub async fn attack(
        &self,
        attacker: (u8, u8),
        target: (u8, u8),
    ) -> Result<TransactionReceipt, GameError> {
        let _op = self.op.lock().await;
        let (contract, game_id) = self.active().await?;
        let call = AttackCall {
            game_id,
            attacker_x: attacker.0,
            attacker_y: attacker.1,
            target_x: target.0,
            target_y: target.1,
        };
        self.send(contract, call.encode(), self.settings.action_gas_limit)
            .await
    }

    // ---- views ----

    pub async fn game_state(&self, game_id: U256) -> Result<GameStateView, GameError> {
        let contract = self.bound_contract().await?;
        let raw: GetGameStateReturn = self
            .view(contract, GetGameStateCall { game_id }.encode(), "getGameState")
            .await?;
        Ok(GameStateView::from_return(game_id, raw))
    }

    pub async fn player_info(&self, game_id: U256, player_index: u8) -> Result<PlayerInfo, GameError> {
        let contract = self.bound_contract().await?;
        let raw: GetPlayerInfoReturn = self
            .view(
                contract,
                GetPlayerInfoCall {
                    game_id,
                    player_index,
                }
                .encode(),
                "getPlayerInfo",
            )
            .await?;
        Ok(raw.into())
    }

    pub async fn board_unit(&self, game_id: U256, x: u8, y: u8) -> Result<Option<BoardUnit>, GameError> {
        let contract = self.bound_contract().await?;
        let raw: GetBoardUnitReturn = self
            .view(contract, GetBoardUnitCall { game_id, x, y }.encode(), "getBoardUnit")
            .await?;
        Ok(BoardUnit::from_return(raw))
    }

    /// Events for the active game since `from_block`, via log query.
    pub async fn fetch_events(&self, from_block: u64) -> Result<Vec<GameEvent>, GameError> {
        let contract = self.bound_contract().await?;
        let game_id = self.game_id().await.ok_or(GameError::NotInGame)?;
        let filter = Filter::new()
            .address(contract)
            .from_block(BlockNumber::Number(from_block.into()))
            .topic1(handle_from_u256(game_id));
        let logs = self.chain().await?.logs(&filter).await?;
        let events = decode_logs(logs.iter().filter(|log| log.address == contract));
        debug!("Fetched {} event(s) for game {}", events.len(), game_id);
        Ok(events)
    }
}
