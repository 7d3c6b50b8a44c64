// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Composition root
//!
//! Builds exactly one session manager, game client and custodian around a
//! shared network context. Nothing in the crate is a global; tests build
//! isolated instances through [`ClientParts`].

use crate::chain::{ChainClients, ReceiptPolicy};
use crate::clock::{Clock, SystemClock};
use crate::config::{ChainRegistry, ClientConfig, Network};
use crate::crypto::{FheBackend, FheBackends, MockBackend, RelayerBridgeBackend};
use crate::game::{GameSessionClient, MainWalletSubmitter, TxSubmitter};
use crate::network::NetworkContext;
use crate::session::SessionKeyManager;
use crate::storage::KeyValueStore;
use crate::vault::SessionWalletCustodian;
use crate::wallet::WalletProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Pre-built collaborators.
pub struct ClientParts {
    pub config: ClientConfig,
    pub network: NetworkContext,
    pub chains: ChainClients,
    pub backends: FheBackends,
    pub store: Arc<dyn KeyValueStore>,
    pub wallet: Arc<dyn WalletProvider>,
    pub clock: Arc<dyn Clock>,
}

pub struct FheightClient {
    config: ClientConfig,
    registry: ChainRegistry,
    network: NetworkContext,
    wallet: Arc<dyn WalletProvider>,
    session: Arc<SessionKeyManager>,
    game: GameSessionClient,
    custodian: SessionWalletCustodian,
}

impl FheightClient {
    /// RPC clients and backends from `config`. The relayer bridge is only
    /// built when a bridge URL is configured.
    pub fn new(
        config: ClientConfig,
        wallet: Arc<dyn WalletProvider>,
        store: Arc<dyn KeyValueStore>,
        network: NetworkContext,
        chains: ChainClients,
    ) -> Result<Self> {
        let registry = config.registry();
        let mock: Arc<dyn FheBackend> = Arc::new(MockBackend::with_verifying_contract(
            config.fhe.verifying_contract_decryption,
        ));
        let relayer: Option<Arc<dyn FheBackend>> = match &config.bridge {
            Some(bridge) => Some(Arc::new(RelayerBridgeBackend::new(
                bridge,
                config.fhe.clone(),
            )?)),
            None => None,
        };
        let backends = FheBackends::new(registry, mock, relayer);

        Ok(Self::from_parts(ClientParts {
            config,
            network,
            chains,
            backends,
            store,
            wallet,
            clock: Arc::new(SystemClock),
        }))
    }

    pub fn from_parts(parts: ClientParts) -> Self {
        let ClientParts {
            config,
            network,
            chains,
            backends,
            store,
            wallet,
            clock,
        } = parts;
        let registry = config.registry();

        let session = Arc::new(SessionKeyManager::new(
            store.clone(),
            Some(wallet.clone()),
            backends.clone(),
            network.clone(),
            clock.clone(),
            config.session.clone(),
        ));
        let submitter: Arc<dyn TxSubmitter> = Arc::new(MainWalletSubmitter::new(wallet.clone()));
        let game = GameSessionClient::new(
            session.clone(),
            backends.clone(),
            chains.clone(),
            network.clone(),
            registry.clone(),
            config.game.clone(),
            clock,
            Some(submitter),
        );
        let receipts = ReceiptPolicy {
            interval: config.game.receipt_poll_interval(),
            max_attempts: config.game.receipt_max_attempts,
        };
        let custodian = SessionWalletCustodian::new(
            session.clone(),
            backends,
            chains,
            network.clone(),
            registry.clone(),
            store,
            config.vault.clone(),
            receipts,
        );

        Self {
            config,
            registry,
            network,
            wallet,
            session,
            game,
            custodian,
        }
    }

    /// Network detection first, then contract binding, then the local
    /// session wallet record.
    pub async fn connect(&self) -> Result<Network> {
        let chain_id = self.wallet.chain_id().await?;
        let network = self.network.network_changed(chain_id).await;
        let contract = self.game.connect().await?;
        info!("🚀 Connected to {} (game {:?})", network, contract);

        if let Err(e) = self.custodian.initialize().await {
            warn!("Session wallet record unavailable: {}", e);
        }
        Ok(network)
    }

    /// Switches the wallet and the shared context, then rebinds the game
    /// contract.
    pub async fn switch_network(&self, network: Network) -> Result<()> {
        self.wallet.switch_chain(network.chain_id()).await?;
        self.network.network_changed(network.chain_id()).await;
        self.game.connect().await?;
        Ok(())
    }

    /// Route gameplay transactions through the session wallet.
    pub async fn use_session_wallet(&self) {
        self.game
            .set_submitter(Arc::new(self.custodian.clone()))
            .await;
        info!("Gameplay transactions now signed by the session wallet");
    }

    pub async fn use_main_wallet(&self) {
        self.game
            .set_submitter(Arc::new(MainWalletSubmitter::new(self.wallet.clone())))
            .await;
    }

    /// The contracts a fresh session should cover on the current network.
    pub async fn session_contracts(&self) -> Vec<ethers::types::Address> {
        let network = self.network.current().await;
        [
            self.registry.game_session(network),
            self.registry.wallet_vault(network),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn network(&self) -> &NetworkContext {
        &self.network
    }

    pub fn wallet(&self) -> &Arc<dyn WalletProvider> {
        &self.wallet
    }

    pub fn session(&self) -> &Arc<SessionKeyManager> {
        &self.session
    }

    pub fn game(&self) -> &GameSessionClient {
        &self.game
    }

    pub fn custodian(&self) -> &SessionWalletCustodian {
        &self.custodian
    }
}
