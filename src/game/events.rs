// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::contract::GameSessionEvents;
use ethers::abi::RawLog;
use ethers::contract::EthLogDecode;
use ethers::types::{Address, Log, U256};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    GameCreated {
        game_id: U256,
        creator: Address,
    },
    PlayerJoined {
        game_id: U256,
        opponent: Address,
    },
    CardDrawn {
        game_id: U256,
        player_index: u8,
    },
    CardPlayed {
        game_id: U256,
        player_index: u8,
        card_id: u16,
        x: u8,
        y: u8,
    },
    GameEnded {
        game_id: U256,
        winner: Address,
    },
}

impl GameEvent {
    pub fn game_id(&self) -> U256 {
        match self {
            GameEvent::GameCreated { game_id, .. }
            | GameEvent::PlayerJoined { game_id, .. }
            | GameEvent::CardDrawn { game_id, .. }
            | GameEvent::CardPlayed { game_id, .. }
            | GameEvent::GameEnded { game_id, .. } => *game_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::GameCreated { .. } => "GameCreated",
            GameEvent::PlayerJoined { .. } => "PlayerJoined",
            GameEvent::CardDrawn { .. } => "CardDrawn",
            GameEvent::CardPlayed { .. } => "CardPlayed",
            GameEvent::GameEnded { .. } => "GameEnded",
        }
    }
}

/// Logs that are not GameSession events are skipped.
pub fn decode_log(log: &Log) -> Option<GameEvent> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let event = GameSessionEvents::decode_log(&raw).ok()?;
    Some(match event {
        GameSessionEvents::GameCreatedFilter(e) => GameEvent::GameCreated {
            game_id: e.game_id,
            creator: e.creator,
        },
        GameSessionEvents::PlayerJoinedFilter(e) => GameEvent::PlayerJoined {
            game_id: e.game_id,
            opponent: e.opponent,
        },
        GameSessionEvents::CardDrawnFilter(e) => GameEvent::CardDrawn {
            game_id: e.game_id,
            player_index: e.player_index,
        },
        GameSessionEvents::CardPlayedFilter(e) => GameEvent::CardPlayed {
            game_id: e.game_id,
            player_index: e.player_index,
            card_id: e.card_id,
            x: e.x,
            y: e.y,
        },
        GameSessionEvents::GameEndedFilter(e) => GameEvent::GameEnded {
            game_id: e.game_id,
            winner: e.winner,
        },
    })
}

pub fn decode_logs<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Vec<GameEvent> {
    logs.into_iter().filter_map(decode_log).collect()
}
