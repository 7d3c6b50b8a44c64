// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod game;
pub mod session;
pub mod wallet;

use crate::app::FheightClient;
use crate::chain::ChainClients;
use crate::config::{ClientConfig, Network};
use crate::network::NetworkContext;
use crate::storage::{FileStore, KeyValueStore};
use crate::wallet::{JsonRpcWallet, LocalKeyWallet, WalletProvider};
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// FHEIGHT session tools
#[derive(Parser, Debug)]
#[command(name = "fheight-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Session keys, session wallet and encrypted-deck games for FHEIGHT", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Main wallet private key
    #[arg(long, env = "MAIN_PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// JSON-RPC endpoint with unlocked accounts, used instead of a local key
    #[arg(long, global = true, conflicts_with = "private_key")]
    pub rpc_wallet: Option<String>,

    /// Network for a local-key wallet (sepolia or hardhat)
    #[arg(long, global = true, default_value = "hardhat")]
    pub network: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session key lifecycle
    #[command(subcommand)]
    Session(session::SessionCommand),

    /// Session wallet custody
    #[command(subcommand)]
    Wallet(wallet::WalletCommand),

    /// Game contract views and a solo game
    #[command(subcommand)]
    Game(game::GameCommand),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let client = build_client(&cli.global).await?;
    match cli.command {
        Commands::Session(cmd) => session::run(&client, cmd).await,
        Commands::Wallet(cmd) => wallet::run(&client, cmd).await,
        Commands::Game(cmd) => game::run(&client, cmd).await,
    }
}

pub async fn build_client(args: &GlobalArgs) -> Result<FheightClient> {
    dotenv::dotenv().ok();

    let config = ClientConfig::load(args.config.as_deref())?;
    let registry = config.registry();
    let network: Network = args.network.parse().map_err(|e: String| anyhow!(e))?;
    let context = NetworkContext::new(network);
    let chains = ChainClients::from_registry(&registry, config.game.receipt_poll_interval())?;

    let wallet: Arc<dyn WalletProvider> = match (&args.rpc_wallet, &args.private_key) {
        (Some(url), _) => Arc::new(JsonRpcWallet::new(url, registry.clone())?),
        (None, Some(key)) => Arc::new(LocalKeyWallet::from_private_key(
            key,
            chains.clone(),
            context.clone(),
        )?),
        (None, None) => {
            return Err(anyhow!(
                "Main wallet required. Use --private-key, set MAIN_PRIVATE_KEY, or pass --rpc-wallet"
            ))
        }
    };
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage.path).await?);

    let client = FheightClient::new(config, wallet, store, context, chains)?;
    client.connect().await?;
    Ok(client)
}
