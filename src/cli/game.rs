// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::app::FheightClient;
use anyhow::Result;
use clap::Subcommand;
use ethers::types::U256;

#[derive(Subcommand, Debug)]
pub enum GameCommand {
    /// Contract-side state of a game
    State { game_id: u64 },

    /// Player seat info
    Player {
        game_id: u64,
        #[arg(default_value_t = 0)]
        index: u8,
    },

    /// Unit on a board tile
    Board { game_id: u64, x: u8, y: u8 },

    /// Start a single-player game, show the opening hand and draw once
    PlaySolo {
        #[arg(long, default_value_t = 1)]
        general: u16,

        /// Comma-separated card ids; padded to 40
        #[arg(long, value_delimiter = ',')]
        deck: Vec<u16>,

        /// Sign game transactions with the session wallet
        #[arg(long)]
        session_wallet: bool,
    },
}

pub async fn run(client: &FheightClient, cmd: GameCommand) -> Result<()> {
    let game = client.game();
    match cmd {
        GameCommand::State { game_id } => {
            let state = game.game_state(U256::from(game_id)).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        GameCommand::Player { game_id, index } => {
            let info = game.player_info(U256::from(game_id), index).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        GameCommand::Board { game_id, x, y } => {
            match game.board_unit(U256::from(game_id), x, y).await? {
                Some(unit) => println!("{}", serde_json::to_string_pretty(&unit)?),
                None => println!("Empty tile ({}, {})", x, y),
            }
        }
        GameCommand::PlaySolo {
            general,
            deck,
            session_wallet,
        } => {
            if session_wallet {
                client.use_session_wallet().await;
            }
            let contracts = client.session_contracts().await;
            client.session().initialize_session(&contracts).await?;

            let game_id = game.create_single_player_game(general, &deck).await?;
            println!("🎮 Game {}", game_id);
            let hand = game.decrypt_hand().await?;
            println!("🃏 Opening hand: {:?}", hand);
            match game.draw_card().await? {
                Some(card) => println!("🃏 Drew {}", card),
                None => println!("No draw (hand full or deck empty)"),
            }
            println!("   {} card(s) left in deck", game.remaining_deck().await);
        }
    }
    Ok(())
}
