// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared test fixtures
//!
//! [`FakeChain`] executes the GameSession and WalletVault ABIs in process,
//! decoding calldata with the generated call enums. [`FakeWallet`] signs with
//! a real key and counts every prompt it would have shown.
#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::{encode, AbiDecode, AbiEncode, Token};
use ethers::contract::EthEvent;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{
    Address, Bytes, Filter, Log, Signature, TransactionReceipt, ValueOrArray, H256, U256, U64,
};
use ethers::utils::rlp::Rlp;
use fheight_session::app::{ClientParts, FheightClient};
use fheight_session::chain::{ChainClient, ChainClients, ChainError, TxRequest};
use fheight_session::clock::{Clock, ManualClock};
use fheight_session::config::{ClientConfig, Network};
use fheight_session::crypto::{ClearType, FheBackend, FheBackends, MockBackend};
use fheight_session::game::contract::{
    CardDrawnFilter, CardPlayedFilter, GameCreatedFilter, GameEndedFilter, GameSessionCalls,
    GetBoardUnitReturn,
    GetCardFromDeckReturn, GetGameStateReturn, GetHandReturn, GetPlayerInfoReturn,
    PlayerJoinedFilter,
};
use fheight_session::network::NetworkContext;
use fheight_session::storage::{KeyValueStore, MemoryStore};
use fheight_session::vault::contract::{
    GetEncryptedKeyReturn, GetSessionWalletReturn, HasKeyReturn, WalletVaultCalls,
};
use fheight_session::wallet::{WalletError, WalletProvider};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const MAIN_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const START_MS: i64 = 1_700_000_000_000;
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Emits a GameCreated with a bogus id into every create receipt, the way
/// coprocessor contracts log into the same transaction.
pub fn decoy_contract() -> Address {
    Address::repeat_byte(0xAC)
}

pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.game.receipt_poll_interval_ms = 1;
    config.game.receipt_max_attempts = 5;
    config
}

// ---- fake chain ----

#[derive(Debug, Clone, Default)]
pub struct Seat {
    pub player: Address,
    pub deck: Vec<H256>,
    pub hand: Vec<H256>,
    pub next_draw: usize,
}

impl Seat {
    fn new(player: Address, deck: Vec<[u8; 32]>) -> Self {
        let deck: Vec<H256> = deck.into_iter().map(H256::from).collect();
        let hand = deck.iter().take(5).copied().collect();
        Self {
            player,
            deck,
            hand,
            next_draw: 5,
        }
    }

    fn draw(&mut self) -> Result<H256, String> {
        let card = *self
            .deck
            .get(self.next_draw)
            .ok_or_else(|| "deck exhausted".to_string())?;
        self.next_draw += 1;
        Ok(card)
    }
}

#[derive(Debug, Clone)]
pub struct FakeGame {
    pub creator: Address,
    pub seats: Vec<Seat>,
    pub state: u8,
    pub current_turn: u8,
    pub turn_number: u8,
    pub winner: Address,
    pub board: HashMap<(u8, u8), (u16, u8, u8, u8)>,
}

impl FakeGame {
    fn seat_index(&self, player: Option<Address>) -> usize {
        player
            .and_then(|p| self.seats.iter().position(|s| s.player == p))
            .unwrap_or(0)
    }
}

#[derive(Default)]
struct ChainState {
    games: HashMap<U256, FakeGame>,
    vault: HashMap<Address, (H256, Address)>,
    receipts: HashMap<H256, TransactionReceipt>,
    polls: HashMap<H256, u32>,
    logs: Vec<Log>,
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    next_game_id: u64,
    tx_count: u64,
    executed: Vec<(Address, String)>,
}

pub struct FakeChain {
    pub chain_id: u64,
    pub game_contract: Address,
    pub vault_contract: Address,
    state: Mutex<ChainState>,
    revert_next: AtomicBool,
    receipt_delay: AtomicU32,
    withhold_receipts: AtomicBool,
    pub deck_reads: AtomicUsize,
    pub hand_reads: AtomicUsize,
    pub raw_transactions: AtomicUsize,
}

pub fn card_drawn_topic() -> H256 {
    CardDrawnFilter::signature()
}

fn topic_u256(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from(bytes)
}

impl FakeChain {
    pub fn new(config: &ClientConfig) -> Self {
        let contracts = &config.hardhat.contracts;
        Self {
            chain_id: config.hardhat.chain_id,
            game_contract: contracts.game_session,
            vault_contract: contracts.wallet_vault.unwrap_or_default(),
            state: Mutex::new(ChainState {
                next_game_id: 1,
                ..Default::default()
            }),
            revert_next: AtomicBool::new(false),
            receipt_delay: AtomicU32::new(0),
            withhold_receipts: AtomicBool::new(false),
            deck_reads: AtomicUsize::new(0),
            hand_reads: AtomicUsize::new(0),
            raw_transactions: AtomicUsize::new(0),
        }
    }

    pub fn revert_next(&self) {
        self.revert_next.store(true, Ordering::SeqCst);
    }

    /// Receipts appear only after `polls` empty polls.
    pub fn set_receipt_delay(&self, polls: u32) {
        self.receipt_delay.store(polls, Ordering::SeqCst);
    }

    pub fn withhold_receipts(&self, withhold: bool) {
        self.withhold_receipts.store(withhold, Ordering::SeqCst);
    }

    pub fn fund(&self, address: Address, amount: U256) {
        let mut state = self.state.lock().unwrap();
        *state.balances.entry(address).or_default() += amount;
    }

    pub fn game(&self, game_id: U256) -> Option<FakeGame> {
        self.state.lock().unwrap().games.get(&game_id).cloned()
    }

    pub fn vault_entry(&self, owner: Address) -> Option<(H256, Address)> {
        self.state.lock().unwrap().vault.get(&owner).copied()
    }

    /// Writes a vault entry directly, bypassing `storeKey`.
    pub fn seed_vault_entry(&self, owner: Address, handle: H256, session_wallet: Address) {
        self.state
            .lock()
            .unwrap()
            .vault
            .insert(owner, (handle, session_wallet));
    }

    /// Function names executed so far, with their senders.
    pub fn executed(&self) -> Vec<(Address, String)> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Applies a transaction and records its receipt. Failures become
    /// status-0 receipts, never errors.
    pub fn execute(&self, from: Address, to: Address, data: &[u8], value: U256) -> H256 {
        let mut state = self.state.lock().unwrap();
        state.tx_count += 1;
        let hash = H256::from_low_u64_be(0xF000_0000 + state.tx_count);
        let block = state.tx_count;
        *state.nonces.entry(from).or_default() += 1;

        let result = if self.revert_next.swap(false, Ordering::SeqCst) {
            Err("forced revert".to_string())
        } else if to == self.game_contract {
            self.exec_game(&mut state, from, data)
        } else if to == self.vault_contract {
            self.exec_vault(&mut state, from, data)
        } else {
            Ok((Vec::new(), "transfer".to_string()))
        };

        let (logs, status) = match result {
            Ok((logs, name)) => {
                state.executed.push((from, name));
                if !value.is_zero() {
                    let balance = state.balances.entry(from).or_default();
                    *balance = balance.saturating_sub(value);
                    *state.balances.entry(to).or_default() += value;
                }
                (logs, 1u64)
            }
            Err(_) => (Vec::new(), 0u64),
        };
        let logs: Vec<Log> = logs
            .into_iter()
            .enumerate()
            .map(|(i, mut log)| {
                log.transaction_hash = Some(hash);
                log.block_number = Some(U64::from(block));
                log.log_index = Some(U256::from(i));
                log
            })
            .collect();
        state.logs.extend(logs.iter().cloned());
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(block)),
            status: Some(U64::from(status)),
            from,
            to: Some(to),
            logs,
            ..Default::default()
        };
        state.receipts.insert(hash, receipt);
        hash
    }

    fn log(&self, address: Address, topics: Vec<H256>, data: Vec<u8>) -> Log {
        Log {
            address,
            topics,
            data: Bytes::from(data),
            ..Default::default()
        }
    }

    fn game_created(&self, address: Address, game_id: U256, creator: Address) -> Log {
        self.log(
            address,
            vec![
                GameCreatedFilter::signature(),
                topic_u256(game_id),
                H256::from(creator),
            ],
            Vec::new(),
        )
    }

    fn exec_game(
        &self,
        state: &mut ChainState,
        from: Address,
        data: &[u8],
    ) -> Result<(Vec<Log>, String), String> {
        let call = GameSessionCalls::decode(data).map_err(|e| e.to_string())?;
        let game = self.game_contract;
        match call {
            GameSessionCalls::CreateGame(c) => {
                let id = U256::from(state.next_game_id);
                state.next_game_id += 1;
                self.open_game(state, id, from, c.encrypted_deck);
                Ok((
                    vec![
                        self.game_created(decoy_contract(), U256::from(999), from),
                        self.game_created(game, id, from),
                    ],
                    "createGame".into(),
                ))
            }
            GameSessionCalls::CreateSinglePlayerGame(c) => {
                self.open_game(state, c.game_id, from, c.encrypted_deck);
                if let Some(g) = state.games.get_mut(&c.game_id) {
                    g.state = 2;
                }
                Ok((
                    vec![
                        self.game_created(decoy_contract(), U256::from(999), from),
                        self.game_created(game, c.game_id, from),
                    ],
                    "createSinglePlayerGame".into(),
                ))
            }
            GameSessionCalls::JoinGame(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                if g.seats.len() > 1 {
                    return Err("game full".into());
                }
                g.seats.push(Seat::new(from, c.encrypted_deck));
                g.state = 1;
                let log = self.log(
                    game,
                    vec![
                        PlayerJoinedFilter::signature(),
                        topic_u256(c.game_id),
                        H256::from(from),
                    ],
                    Vec::new(),
                );
                Ok((vec![log], "joinGame".into()))
            }
            GameSessionCalls::CompleteMulligan(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                let idx = g.seat_index(Some(from));
                let seat = &mut g.seats[idx];
                for (slot, swap) in c.mulligan_slots.iter().enumerate() {
                    if *swap && slot < seat.hand.len() {
                        seat.hand[slot] = seat.draw()?;
                    }
                }
                g.state = 2;
                Ok((Vec::new(), "completeMulligan".into()))
            }
            GameSessionCalls::ReplaceCard(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                let idx = g.seat_index(Some(from));
                let seat = &mut g.seats[idx];
                let slot = c.hand_slot as usize;
                if slot >= seat.hand.len() {
                    return Err("bad slot".into());
                }
                seat.hand[slot] = seat.draw()?;
                Ok((Vec::new(), "replaceCard".into()))
            }
            GameSessionCalls::PlayCard(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                let idx = g.seat_index(Some(from));
                let seat = &mut g.seats[idx];
                let slot = c.hand_slot as usize;
                let handle = *seat.hand.get(slot).ok_or("bad slot")?;
                let clear = MockBackend::unpack(&handle, ClearType::Uint16).low_u32() as u16;
                if clear != c.card_id {
                    return Err("card id does not match handle".into());
                }
                seat.hand.remove(slot);
                g.board.insert((c.x, c.y), (c.card_id, idx as u8, 2, 2));
                let data = encode(&[
                    Token::Uint(U256::from(idx)),
                    Token::Uint(U256::from(c.card_id)),
                    Token::Uint(U256::from(c.x)),
                    Token::Uint(U256::from(c.y)),
                ]);
                let log = self.log(
                    game,
                    vec![CardPlayedFilter::signature(), topic_u256(c.game_id)],
                    data,
                );
                Ok((vec![log], "playCard".into()))
            }
            GameSessionCalls::EndTurn(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                g.turn_number = g.turn_number.saturating_add(1);
                if g.seats.len() > 1 {
                    g.current_turn = 1 - g.current_turn;
                }
                // Start-of-turn draw for the next player; a full hand or an
                // empty deck draws nothing.
                let idx = g.current_turn as usize;
                let mut logs = Vec::new();
                if let Some(seat) = g.seats.get_mut(idx) {
                    if seat.hand.len() < 6 && seat.next_draw < seat.deck.len() {
                        let card = seat.draw()?;
                        seat.hand.push(card);
                        logs.push(self.log(
                            game,
                            vec![card_drawn_topic(), topic_u256(c.game_id)],
                            encode(&[Token::Uint(U256::from(idx))]),
                        ));
                    }
                }
                Ok((logs, "endTurn".into()))
            }
            GameSessionCalls::Resign(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                let idx = g.seat_index(Some(from));
                g.winner = g
                    .seats
                    .iter()
                    .enumerate()
                    .find(|(i, _)| *i != idx)
                    .map(|(_, s)| s.player)
                    .unwrap_or_default();
                g.state = 3;
                let log = self.log(
                    game,
                    vec![GameEndedFilter::signature(), topic_u256(c.game_id)],
                    encode(&[Token::Address(g.winner)]),
                );
                Ok((vec![log], "resign".into()))
            }
            GameSessionCalls::MoveUnit(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                let unit = g.board.remove(&(c.from_x, c.from_y)).ok_or("no unit")?;
                g.board.insert((c.to_x, c.to_y), unit);
                Ok((Vec::new(), "moveUnit".into()))
            }
            GameSessionCalls::Attack(c) => {
                let g = state.games.get_mut(&c.game_id).ok_or("no such game")?;
                let (atk, _) = g
                    .board
                    .get(&(c.attacker_x, c.attacker_y))
                    .map(|u| (u.2, u.3))
                    .ok_or("no attacker")?;
                let target = g
                    .board
                    .get_mut(&(c.target_x, c.target_y))
                    .ok_or("no target")?;
                target.3 = target.3.saturating_sub(atk);
                if target.3 == 0 {
                    g.board.remove(&(c.target_x, c.target_y));
                }
                Ok((Vec::new(), "attack".into()))
            }
            _ => Err("view function sent as transaction".into()),
        }
    }

    fn open_game(&self, state: &mut ChainState, id: U256, from: Address, deck: Vec<[u8; 32]>) {
        state.games.insert(
            id,
            FakeGame {
                creator: from,
                seats: vec![Seat::new(from, deck)],
                state: 0,
                current_turn: 0,
                turn_number: 1,
                winner: Address::zero(),
                board: HashMap::new(),
            },
        );
    }

    fn exec_vault(
        &self,
        state: &mut ChainState,
        from: Address,
        data: &[u8],
    ) -> Result<(Vec<Log>, String), String> {
        match WalletVaultCalls::decode(data).map_err(|e| e.to_string())? {
            WalletVaultCalls::StoreKey(c) => {
                state
                    .vault
                    .insert(from, (H256::from(c.encrypted_key), c.session_wallet));
                Ok((Vec::new(), "storeKey".into()))
            }
            WalletVaultCalls::ClearKey(_) => {
                state.vault.remove(&from).ok_or("no key")?;
                Ok((Vec::new(), "clearKey".into()))
            }
            _ => Err("view function sent as transaction".into()),
        }
    }

    fn view(&self, to: Address, data: &[u8], from: Option<Address>) -> Result<Vec<u8>, String> {
        let state = self.state.lock().unwrap();
        if to == self.game_contract {
            let call = GameSessionCalls::decode(data).map_err(|e| e.to_string())?;
            match call {
                GameSessionCalls::GetCardFromDeck(c) => {
                    self.deck_reads.fetch_add(1, Ordering::SeqCst);
                    let g = state.games.get(&c.game_id).ok_or("no such game")?;
                    let seat = &g.seats[g.seat_index(from)];
                    let card = seat.deck.get(c.index as usize).ok_or("index out of range")?;
                    Ok(GetCardFromDeckReturn(card.0).encode())
                }
                GameSessionCalls::GetHand(c) => {
                    self.hand_reads.fetch_add(1, Ordering::SeqCst);
                    let g = state.games.get(&c.game_id).ok_or("no such game")?;
                    let seat = &g.seats[g.seat_index(from)];
                    // Trailing empty slot: only `handSize` entries are real.
                    let mut handles: Vec<[u8; 32]> = seat.hand.iter().map(|h| h.0).collect();
                    handles.push([0u8; 32]);
                    Ok(GetHandReturn {
                        handles,
                        hand_size: seat.hand.len() as u8,
                    }
                    .encode())
                }
                GameSessionCalls::GetGameState(c) => {
                    let g = state.games.get(&c.game_id).ok_or("no such game")?;
                    Ok(GetGameStateReturn {
                        state: g.state,
                        current_turn: g.current_turn,
                        turn_number: g.turn_number,
                        creator: g.creator,
                        opponent: g.seats.get(1).map(|s| s.player).unwrap_or_default(),
                        winner: g.winner,
                    }
                    .encode())
                }
                GameSessionCalls::GetPlayerInfo(c) => {
                    let g = state.games.get(&c.game_id).ok_or("no such game")?;
                    let seat = g.seats.get(c.player_index as usize).ok_or("no such seat")?;
                    Ok(GetPlayerInfoReturn {
                        wallet: seat.player,
                        hand_size: seat.hand.len() as u8,
                        deck_remaining: (seat.deck.len() - seat.next_draw) as u8,
                        mana: 2,
                        max_mana: 2,
                        general_hp: 25,
                    }
                    .encode())
                }
                GameSessionCalls::GetBoardUnit(c) => {
                    let g = state.games.get(&c.game_id).ok_or("no such game")?;
                    let out = match g.board.get(&(c.x, c.y)) {
                        Some((card_id, owner, atk, hp)) => GetBoardUnitReturn {
                            card_id: *card_id,
                            owner: *owner,
                            atk: *atk,
                            hp: *hp,
                            exists: true,
                        },
                        None => GetBoardUnitReturn::default(),
                    };
                    Ok(out.encode())
                }
                _ => Err("not a view".into()),
            }
        } else if to == self.vault_contract {
            match WalletVaultCalls::decode(data).map_err(|e| e.to_string())? {
                WalletVaultCalls::HasKey(c) => {
                    Ok(HasKeyReturn(state.vault.contains_key(&c.owner)).encode())
                }
                WalletVaultCalls::GetSessionWallet(c) => Ok(GetSessionWalletReturn(
                    state.vault.get(&c.owner).map(|e| e.1).unwrap_or_default(),
                )
                .encode()),
                WalletVaultCalls::GetEncryptedKey(_) => {
                    let owner = from.ok_or("getEncryptedKey needs a sender")?;
                    let (handle, _) = state.vault.get(&owner).ok_or("no key stored")?;
                    Ok(GetEncryptedKeyReturn(handle.0).encode())
                }
                _ => Err("not a view".into()),
            }
        } else {
            Err(format!("no contract at {:?}", to))
        }
    }
}

fn filter_address(filter: &Filter) -> Option<Address> {
    match &filter.address {
        Some(ValueOrArray::Value(address)) => Some(*address),
        _ => None,
    }
}

fn filter_topic1(filter: &Filter) -> Option<H256> {
    match &filter.topics[1] {
        Some(ValueOrArray::Value(Some(topic))) => Some(*topic),
        _ => None,
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn call(
        &self,
        to: Address,
        data: Bytes,
        from: Option<Address>,
    ) -> Result<Bytes, ChainError> {
        self.view(to, data.as_ref(), from)
            .map(Bytes::from)
            .map_err(|e| ChainError::Provider(format!("execution reverted: {}", e)))
    }

    async fn estimate_gas(
        &self,
        _from: Address,
        _to: Address,
        _data: Bytes,
        _value: U256,
    ) -> Result<U256, ChainError> {
        Ok(U256::from(100_000u64))
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        if self.withhold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let mut state = self.state.lock().unwrap();
        let polls = state.polls.entry(hash).or_default();
        *polls += 1;
        if *polls <= self.receipt_delay.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn transaction_count(&self, address: Address) -> Result<U256, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(U256::from(state.nonces.get(&address).copied().unwrap_or(0)))
    }

    async fn gas_price(&self) -> Result<U256, ChainError> {
        Ok(U256::from(1_000_000_000u64))
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainError> {
        self.raw_transactions.fetch_add(1, Ordering::SeqCst);
        let rlp = Rlp::new(raw.as_ref());
        let (tx, signature) = TypedTransaction::decode_signed(&rlp)
            .map_err(|e| ChainError::Provider(format!("bad raw transaction: {}", e)))?;
        let from = signature
            .recover(tx.sighash())
            .map_err(|e| ChainError::Provider(e.to_string()))?;
        let to = tx
            .to_addr()
            .copied()
            .ok_or_else(|| ChainError::Provider("contract creation unsupported".into()))?;
        let data = tx.data().cloned().unwrap_or_default();
        let value = tx.value().copied().unwrap_or_default();
        Ok(self.execute(from, to, data.as_ref(), value))
    }

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError> {
        let address = filter_address(filter);
        let topic1 = filter_topic1(filter);
        let state = self.state.lock().unwrap();
        Ok(state
            .logs
            .iter()
            .filter(|log| address.map_or(true, |a| log.address == a))
            .filter(|log| topic1.map_or(true, |t| log.topics.get(1) == Some(&t)))
            .cloned()
            .collect())
    }
}

// ---- fake wallet ----

pub struct FakeWallet {
    signer: LocalWallet,
    chain: Arc<FakeChain>,
    chain_id: AtomicU64,
    pub sign_prompts: AtomicUsize,
    pub tx_prompts: AtomicUsize,
    reject_signatures: AtomicBool,
    reject_transactions: AtomicBool,
}

impl FakeWallet {
    pub fn new(chain: Arc<FakeChain>) -> Self {
        let signer = LocalWallet::from_str(MAIN_KEY.trim_start_matches("0x")).unwrap();
        let chain_id = chain.chain_id;
        Self {
            signer,
            chain,
            chain_id: AtomicU64::new(chain_id),
            sign_prompts: AtomicUsize::new(0),
            tx_prompts: AtomicUsize::new(0),
            reject_signatures: AtomicBool::new(false),
            reject_transactions: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn sign_prompts(&self) -> usize {
        self.sign_prompts.load(Ordering::SeqCst)
    }

    pub fn tx_prompts(&self) -> usize {
        self.tx_prompts.load(Ordering::SeqCst)
    }

    pub fn reject_signatures(&self, reject: bool) {
        self.reject_signatures.store(reject, Ordering::SeqCst);
    }

    pub fn reject_transactions(&self, reject: bool) {
        self.reject_transactions.store(reject, Ordering::SeqCst);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.signer.address()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn sign_typed_data(
        &self,
        account: Address,
        data: &TypedData,
    ) -> Result<Signature, WalletError> {
        self.sign_prompts.fetch_add(1, Ordering::SeqCst);
        if self.reject_signatures.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        if account != self.signer.address() {
            return Err(WalletError::NotConnected);
        }
        self.signer
            .sign_typed_data(data)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))
    }

    async fn send_transaction(&self, from: Address, tx: &TxRequest) -> Result<H256, WalletError> {
        self.tx_prompts.fetch_add(1, Ordering::SeqCst);
        if self.reject_transactions.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        Ok(self.chain.execute(from, tx.to, tx.data.as_ref(), tx.value))
    }
}

// ---- harness ----

/// One client instance over a fake chain. [`Harness::restart`] builds a
/// second client over the same chain, wallet and store, like a page reload.
pub struct Harness {
    pub config: ClientConfig,
    pub chain: Arc<FakeChain>,
    pub wallet: Arc<FakeWallet>,
    pub store: MemoryStore,
    pub clock: ManualClock,
    pub client: FheightClient,
}

impl Harness {
    pub async fn new() -> Self {
        let config = test_config();
        let chain = Arc::new(FakeChain::new(&config));
        let wallet = Arc::new(FakeWallet::new(chain.clone()));
        Self::build(
            config,
            chain,
            wallet,
            MemoryStore::new(),
            ManualClock::new(START_MS),
        )
        .await
    }

    pub async fn restart(&self) -> Self {
        Self::build(
            self.config.clone(),
            self.chain.clone(),
            self.wallet.clone(),
            self.store.clone(),
            self.clock.clone(),
        )
        .await
    }

    async fn build(
        config: ClientConfig,
        chain: Arc<FakeChain>,
        wallet: Arc<FakeWallet>,
        store: MemoryStore,
        clock: ManualClock,
    ) -> Self {
        let registry = config.registry();
        let mock: Arc<dyn FheBackend> = Arc::new(MockBackend::with_verifying_contract(
            config.fhe.verifying_contract_decryption,
        ));
        let chain_client: Arc<dyn ChainClient> = chain.clone();
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let kv: Arc<dyn KeyValueStore> = Arc::new(store.clone());
        let clock_dyn: Arc<dyn Clock> = Arc::new(clock.clone());
        let client = FheightClient::from_parts(ClientParts {
            config: config.clone(),
            network: NetworkContext::new(Network::Hardhat),
            chains: ChainClients::new().with(Network::Hardhat, chain_client),
            backends: FheBackends::mock_only(registry, mock),
            store: kv,
            wallet: provider,
            clock: clock_dyn,
        });
        client.connect().await.unwrap();
        Self {
            config,
            chain,
            wallet,
            store,
            clock,
            client,
        }
    }

    pub fn game_contract(&self) -> Address {
        self.chain.game_contract
    }

    pub fn vault_contract(&self) -> Address {
        self.chain.vault_contract
    }

    pub fn main_address(&self) -> Address {
        self.wallet.address()
    }

    /// Game plus vault, the set a fresh session signs for.
    pub fn all_contracts(&self) -> Vec<Address> {
        vec![self.game_contract(), self.vault_contract()]
    }

    pub async fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }
}

/// A 40-card deck of distinct ids, 100..140.
pub fn distinct_deck() -> Vec<u16> {
    (100..140).collect()
}

/// Authorized session, a created game and a decrypted opening hand.
pub async fn start_game(h: &Harness) -> U256 {
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let game_id = h
        .client
        .game()
        .create_game(1, &distinct_deck())
        .await
        .unwrap();
    h.client.game().decrypt_hand().await.unwrap();
    game_id
}

/// Clear card ids of a seat's contract-side deck, in deck order.
pub fn clear_deck(chain: &FakeChain, game_id: U256) -> Vec<u16> {
    chain.game(game_id).unwrap().seats[0]
        .deck
        .iter()
        .map(|h| MockBackend::unpack(h, ClearType::Uint16).low_u32() as u16)
        .collect()
}
