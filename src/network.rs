// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Active network context
//!
//! Components never probe the wallet for the "current" network on their own.
//! They hold a [`NetworkContext`] and the composition root feeds it through
//! [`NetworkContext::network_changed`] whenever the wallet reports a new chain.

use crate::config::Network;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkState {
    pub network: Network,
    /// Chain id as reported by the wallet, which may differ from
    /// `network.chain_id()` when the fallback was applied.
    pub chain_id: u64,
}

/// Cheap to clone; every clone shares one watch channel.
#[derive(Clone)]
pub struct NetworkContext {
    state: Arc<watch::Sender<NetworkState>>,
}

impl NetworkContext {
    pub fn new(network: Network) -> Self {
        let state = NetworkState {
            network,
            chain_id: network.chain_id(),
        };
        let (state, _) = watch::channel(state);
        Self {
            state: Arc::new(state),
        }
    }

    pub async fn current(&self) -> Network {
        self.state.borrow().network
    }

    pub async fn state(&self) -> NetworkState {
        *self.state.borrow()
    }

    /// The single transition point for the active network. Returns the
    /// resolved network (unknown chains resolve to sepolia).
    pub async fn network_changed(&self, chain_id: u64) -> Network {
        let network = Network::resolve(chain_id);
        let next = NetworkState { network, chain_id };
        // Updates even with no receivers; only a real change notifies.
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            info!(
                "🔗 Network changed: {} (chain {}) -> {} (chain {})",
                state.network, state.chain_id, network, chain_id
            );
            *state = next;
            true
        });
        network
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.state.subscribe()
    }
}
