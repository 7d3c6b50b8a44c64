// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::app::FheightClient;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Load or create a session covering the game and vault contracts
    Init {
        /// Seal the stored record with a PIN
        #[arg(long, env = "FHEIGHT_SESSION_PIN", hide_env_values = true)]
        pin: Option<String>,

        /// Always sign a new authorization
        #[arg(long, conflicts_with = "pin")]
        refresh: bool,
    },

    /// Show the current session
    Status,

    /// Drop the session from memory and storage
    Clear,
}

pub async fn run(client: &FheightClient, cmd: SessionCommand) -> Result<()> {
    let session = client.session();
    match cmd {
        SessionCommand::Init { pin, refresh } => {
            let contracts = client.session_contracts().await;
            let init = match (pin, refresh) {
                (Some(pin), _) => session.initialize_session_with_pin(&contracts, &pin).await?,
                (None, true) => session.refresh_session(&contracts).await?,
                (None, false) => session.initialize_session(&contracts).await?,
            };
            if init.from_cache {
                println!("♻️  Reusing stored session");
            } else {
                println!("✅ New session authorized");
            }
            print_status(client).await;
        }
        SessionCommand::Status => {
            if !session.is_session_valid().await {
                let stored = session.has_stored_session().await?;
                println!("No active session in memory (stored record: {})", stored);
                return Ok(());
            }
            print_status(client).await;
        }
        SessionCommand::Clear => {
            session.clear_session().await?;
            println!("🗑️  Session cleared");
        }
    }
    Ok(())
}

async fn print_status(client: &FheightClient) {
    let Some(info) = client.session().session_info().await else {
        println!("No session");
        return;
    };
    println!("\n📋 Session:");
    println!("  Valid:       {}", info.valid);
    println!("  Signature:   {}...", info.signature_prefix);
    println!("  Start:       {}", info.start_timestamp.unwrap_or_default());
    println!("  Days:        {}", info.duration_days.unwrap_or_default());
    if let Some(expiry) = info.expiry_ms.and_then(chrono::DateTime::from_timestamp_millis) {
        println!("  Expires:     {}", expiry.to_rfc3339());
    }
    for contract in info.contracts {
        println!("  Contract:    {:?}", contract);
    }
}
