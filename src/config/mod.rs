// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client configuration
//!
//! Defaults describe the two supported deployments (sepolia, hardhat). A TOML
//! file can override any section and environment variables override the file:
//!
//! | Variable               | Field                        |
//! |------------------------|------------------------------|
//! | `SEPOLIA_RPC_URL`      | `sepolia.rpc_url`            |
//! | `HARDHAT_RPC_URL`      | `hardhat.rpc_url`            |
//! | `FHEIGHT_BRIDGE_URL`   | `bridge.url`                 |
//! | `FHEIGHT_STORAGE_PATH` | `storage.path`               |
//! | `FHEIGHT_SESSION_DAYS` | `session.duration_days`      |

pub mod chains;
pub mod fhe;

pub use chains::{BackendKind, ChainRegistry, ContractAddresses, Network, NetworkSettings};
pub use fhe::FheSdkConfig;

use anyhow::{anyhow, Result};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const SESSION_STORAGE_KEY: &str = "fheight_fhe_session";
pub const SESSION_WALLET_STORAGE_PREFIX: &str = "fheight_session_wallet_address_";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub storage_key: String,
    pub duration_days: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            storage_key: SESSION_STORAGE_KEY.to_string(),
            duration_days: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub create_gas_limit: u64,
    pub action_gas_limit: u64,
    pub play_gas_limit: u64,
    pub receipt_poll_interval_ms: u64,
    pub receipt_max_attempts: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            create_gas_limit: 0x7A1200,
            action_gas_limit: 0x100000,
            play_gas_limit: 0x200000,
            receipt_poll_interval_ms: 1000,
            receipt_max_attempts: 60,
        }
    }
}

impl GameSettings {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn gas(&self, limit: u64) -> U256 {
        U256::from(limit)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    pub storage_prefix: String,
    pub store_gas_limit: u64,
    pub clear_gas_limit: u64,
    pub balance_poll_secs: u64,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            storage_prefix: SESSION_WALLET_STORAGE_PREFIX.to_string(),
            store_gas_limit: 0x200000,
            clear_gas_limit: 0x100000,
            balance_poll_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub url: String,
    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
}

fn default_bridge_timeout() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/fheight-storage.json"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub sepolia: NetworkSettings,
    pub hardhat: NetworkSettings,
    pub fhe: FheSdkConfig,
    pub bridge: Option<BridgeSettings>,
    pub session: SessionSettings,
    pub game: GameSettings,
    pub vault: VaultSettings,
    pub storage: StorageSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sepolia: NetworkSettings::sepolia(),
            hardhat: NetworkSettings::hardhat(),
            fhe: FheSdkConfig::default(),
            bridge: None,
            session: SessionSettings::default(),
            game: GameSettings::default(),
            vault: VaultSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// `.env` first, then the optional file, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => {
                info!("Loading client config from {:?}", p);
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("SEPOLIA_RPC_URL") {
            self.sepolia.rpc_url = val;
        }
        if let Ok(val) = std::env::var("HARDHAT_RPC_URL") {
            self.hardhat.rpc_url = val;
        }
        if let Ok(val) = std::env::var("FHEIGHT_BRIDGE_URL") {
            let timeout_secs = self
                .bridge
                .as_ref()
                .map(|b| b.timeout_secs)
                .unwrap_or_else(default_bridge_timeout);
            self.bridge = Some(BridgeSettings { url: val, timeout_secs });
        }
        if let Ok(val) = std::env::var("FHEIGHT_STORAGE_PATH") {
            self.storage.path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("FHEIGHT_SESSION_DAYS") {
            if let Ok(days) = val.parse() {
                self.session.duration_days = days;
            }
        }
        debug!("Applied environment overrides to client config");
    }

    pub fn validate(&self) -> Result<()> {
        for settings in [&self.sepolia, &self.hardhat] {
            url::Url::parse(&settings.rpc_url)
                .map_err(|e| anyhow!("Invalid RPC URL for {}: {}", settings.name, e))?;
        }
        url::Url::parse(&self.fhe.relayer_url)
            .map_err(|e| anyhow!("Invalid relayer URL: {}", e))?;
        if let Some(bridge) = &self.bridge {
            url::Url::parse(&bridge.url).map_err(|e| anyhow!("Invalid bridge URL: {}", e))?;
        }
        if self.session.duration_days == 0 {
            return Err(anyhow!("session.duration_days must be at least 1"));
        }
        if self.game.receipt_max_attempts == 0 {
            return Err(anyhow!("game.receipt_max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn network(&self, network: Network) -> &NetworkSettings {
        match network {
            Network::Sepolia => &self.sepolia,
            Network::Hardhat => &self.hardhat,
        }
    }

    pub fn registry(&self) -> ChainRegistry {
        let mut networks = HashMap::new();
        networks.insert(Network::Sepolia, self.sepolia.clone());
        networks.insert(Network::Hardhat, self.hardhat.clone());
        ChainRegistry::with_settings(networks)
    }
}
