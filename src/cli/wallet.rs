// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::app::FheightClient;
use anyhow::{anyhow, Result};
use clap::Subcommand;
use ethers::types::Address;
use std::str::FromStr;

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Generate a session wallet and store its key in the vault
    Create,

    /// Decrypt the vaulted key and print it
    Reveal,

    /// Reconcile the local record with the vault
    Sync,

    /// Session wallet balance
    Balance,

    /// Send ETH from the session wallet
    Send {
        #[arg(long)]
        to: String,

        /// Amount in ETH
        #[arg(long)]
        amount: String,
    },

    /// Forget the session wallet
    Clear {
        /// Leave the vault entry in place
        #[arg(long)]
        local_only: bool,
    },
}

pub async fn run(client: &FheightClient, cmd: WalletCommand) -> Result<()> {
    let custodian = client.custodian();
    match cmd {
        WalletCommand::Create => {
            let address = custodian.create_wallet().await?;
            println!("✅ Session wallet: {:?}", address);
            println!("   Fund it before playing; the key is stored encrypted in the vault.");
        }
        WalletCommand::Reveal => {
            let key = custodian.retrieve_from_chain().await?;
            println!("⚠️  Keep this secret:");
            println!("{}", key);
        }
        WalletCommand::Sync => match custodian.sync_with_blockchain().await? {
            Some(address) => println!("🔄 Session wallet on chain: {:?}", address),
            None => println!("No session wallet stored in the vault"),
        },
        WalletCommand::Balance => {
            if custodian.address().await.is_none() {
                return Err(anyhow!("No session wallet. Run `wallet create` or `wallet sync`"));
            }
            let balance = custodian.refresh_balance().await?;
            println!("💰 {} ETH", balance);
        }
        WalletCommand::Send { to, amount } => {
            let to = Address::from_str(&to).map_err(|e| anyhow!("Invalid address {}: {}", to, e))?;
            let receipt = custodian.send_eth(to, &amount).await?;
            println!("✅ Sent in {:?}", receipt.transaction_hash);
        }
        WalletCommand::Clear { local_only } => {
            custodian.clear_wallet(!local_only).await?;
            println!("🗑️  Session wallet cleared");
        }
    }
    Ok(())
}
