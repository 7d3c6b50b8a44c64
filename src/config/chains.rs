// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Networks the game contracts are deployed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Sepolia,
    Hardhat,
}

impl Network {
    pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
    pub const HARDHAT_CHAIN_ID: u64 = 31337;

    pub fn all() -> [Network; 2] {
        [Network::Sepolia, Network::Hardhat]
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Sepolia => Self::SEPOLIA_CHAIN_ID,
            Network::Hardhat => Self::HARDHAT_CHAIN_ID,
        }
    }

    /// Exact lookup, `None` for chains we have no deployment on.
    pub fn from_chain_id(chain_id: u64) -> Option<Network> {
        match chain_id {
            Self::SEPOLIA_CHAIN_ID => Some(Network::Sepolia),
            Self::HARDHAT_CHAIN_ID => Some(Network::Hardhat),
            _ => None,
        }
    }

    /// Lookup with the sepolia fallback used for contract addressing.
    pub fn resolve(chain_id: u64) -> Network {
        Self::from_chain_id(chain_id).unwrap_or_else(|| {
            warn!(
                "⚠️  Unknown chain id {}, falling back to sepolia contract addressing",
                chain_id
            );
            Network::Sepolia
        })
    }

    /// Public networks must never run against the mock backend.
    pub fn is_production(&self) -> bool {
        matches!(self, Network::Sepolia)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Sepolia => "sepolia",
            Network::Hardhat => "hardhat",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sepolia" => Ok(Network::Sepolia),
            "hardhat" | "localhost" => Ok(Network::Hardhat),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Which confidential-compute backend serves a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Mock,
    Relayer,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub game_session: Address,
    pub wallet_vault: Option<Address>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    pub backend: BackendKind,
}

fn parse_address(raw: &str) -> Address {
    Address::from_str(raw).unwrap_or_else(|_| Address::zero())
}

impl NetworkSettings {
    pub fn sepolia() -> Self {
        NetworkSettings {
            chain_id: Network::SEPOLIA_CHAIN_ID,
            name: "Sepolia".to_string(),
            rpc_url: "https://rpc.sepolia.org".to_string(),
            contracts: ContractAddresses {
                game_session: parse_address("0x0Cc86698f008a6b86d1469Dcc8929E4FF7c28dBD"),
                wallet_vault: Some(parse_address("0x053E51a173b863E6495Dd1AeDCB0F9766e03f4A0")),
            },
            backend: BackendKind::Relayer,
        }
    }

    pub fn hardhat() -> Self {
        NetworkSettings {
            chain_id: Network::HARDHAT_CHAIN_ID,
            name: "Hardhat".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contracts: ContractAddresses {
                game_session: parse_address("0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"),
                wallet_vault: Some(parse_address("0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9")),
            },
            backend: BackendKind::Mock,
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Sepolia => Self::sepolia(),
            Network::Hardhat => Self::hardhat(),
        }
    }
}

/// Deployment table keyed by network.
#[derive(Clone, Debug)]
pub struct ChainRegistry {
    networks: HashMap<Network, NetworkSettings>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        let mut networks = HashMap::new();
        for network in Network::all() {
            networks.insert(network, NetworkSettings::for_network(network));
        }
        ChainRegistry { networks }
    }

    pub fn with_settings(networks: HashMap<Network, NetworkSettings>) -> Self {
        ChainRegistry { networks }
    }

    pub fn get(&self, network: Network) -> Option<&NetworkSettings> {
        self.networks.get(&network)
    }

    pub fn insert(&mut self, network: Network, settings: NetworkSettings) {
        self.networks.insert(network, settings);
    }

    pub fn game_session(&self, network: Network) -> Option<Address> {
        self.get(network).map(|s| s.contracts.game_session)
    }

    pub fn wallet_vault(&self, network: Network) -> Option<Address> {
        self.get(network)
            .and_then(|s| s.contracts.wallet_vault)
            .filter(|addr| !addr.is_zero())
    }

    pub fn backend_kind(&self, network: Network) -> BackendKind {
        self.get(network)
            .map(|s| s.backend)
            .unwrap_or(BackendKind::Mock)
    }

    pub fn list_supported_networks(&self) -> Vec<Network> {
        self.networks.keys().copied().collect()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
