// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::contract::{GetBoardUnitReturn, GetGameStateReturn, GetPlayerInfoReturn};
use ethers::types::{Address, U256};
use serde::Serialize;
use std::fmt;

/// Lifecycle of one client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameStatus {
    Disconnected,
    Connected,
    Creating,
    Joining,
    InGame,
    Ended,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// On-chain game phase as reported by `getGameState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContractPhase {
    WaitingForPlayer,
    Mulligan,
    InProgress,
    Ended,
    Unknown(u8),
}

impl From<u8> for ContractPhase {
    fn from(raw: u8) -> Self {
        match raw {
            0 => ContractPhase::WaitingForPlayer,
            1 => ContractPhase::Mulligan,
            2 => ContractPhase::InProgress,
            3 => ContractPhase::Ended,
            other => ContractPhase::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStateView {
    pub game_id: U256,
    pub phase: ContractPhase,
    pub current_turn: u8,
    pub turn_number: u8,
    pub creator: Address,
    pub opponent: Option<Address>,
    pub winner: Option<Address>,
}

fn non_zero(addr: Address) -> Option<Address> {
    if addr.is_zero() {
        None
    } else {
        Some(addr)
    }
}

impl GameStateView {
    pub fn from_return(game_id: U256, raw: GetGameStateReturn) -> Self {
        Self {
            game_id,
            phase: ContractPhase::from(raw.state),
            current_turn: raw.current_turn,
            turn_number: raw.turn_number,
            creator: raw.creator,
            opponent: non_zero(raw.opponent),
            winner: non_zero(raw.winner),
        }
    }

    /// Seat index of `player`, if seated.
    pub fn seat_of(&self, player: Address) -> Option<u8> {
        if player == self.creator {
            Some(0)
        } else if Some(player) == self.opponent {
            Some(1)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    pub wallet: Address,
    pub hand_size: u8,
    pub deck_remaining: u8,
    pub mana: u8,
    pub max_mana: u8,
    pub general_hp: u16,
}

impl From<GetPlayerInfoReturn> for PlayerInfo {
    fn from(raw: GetPlayerInfoReturn) -> Self {
        Self {
            wallet: raw.wallet,
            hand_size: raw.hand_size,
            deck_remaining: raw.deck_remaining,
            mana: raw.mana,
            max_mana: raw.max_mana,
            general_hp: raw.general_hp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardUnit {
    pub card_id: u16,
    pub owner: u8,
    pub atk: u8,
    pub hp: u8,
}

impl BoardUnit {
    /// `None` for an empty tile.
    pub fn from_return(raw: GetBoardUnitReturn) -> Option<Self> {
        raw.exists.then_some(BoardUnit {
            card_id: raw.card_id,
            owner: raw.owner,
            atk: raw.atk,
            hp: raw.hp,
        })
    }
}
