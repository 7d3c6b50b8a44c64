// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::common::{distinct_deck, Harness};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::parse_ether;
use fheight_session::storage::KeyValueStore;
use fheight_session::vault::{CustodianEvent, VaultError};
use std::str::FromStr;
use std::sync::atomic::Ordering;

fn record_key(h: &Harness) -> String {
    format!("{}{:?}", h.config.vault.storage_prefix, h.main_address())
}

#[tokio::test]
async fn test_create_persists_address_only() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let custodian = h.client.custodian();
    let mut events = custodian.subscribe();

    let address = custodian.create_wallet().await.unwrap();
    assert!(custodian.has_wallet().await);
    assert!(custodian.is_loaded().await);
    assert_eq!(custodian.address().await, Some(address));

    let stored = h.stored(&record_key(&h)).await.unwrap();
    assert_eq!(Address::from_str(&stored).unwrap(), address);

    let key = custodian.get_private_key().await.unwrap();
    let snapshot = h.store.snapshot().await.unwrap().to_lowercase();
    assert!(!snapshot.contains(key.trim_start_matches("0x")));

    let (stored_handle, stored_wallet) = h.chain.vault_entry(h.main_address()).unwrap();
    assert_eq!(stored_wallet, address);
    assert!(!stored_handle.is_zero());
    // The on-chain ciphertext handle must not be the key itself.
    assert_ne!(format!("{:?}", stored_handle), key.to_lowercase());

    let mut steps = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            CustodianEvent::Progress { step, total, .. } => {
                assert_eq!(total, 4);
                steps.push(step);
            }
            CustodianEvent::Created { address: created } => assert_eq!(created, address),
            _ => {}
        }
    }
    assert_eq!(steps, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_reverted_store_persists_nothing() {
    let h = Harness::new().await;
    h.chain.revert_next();

    let err = h.client.custodian().create_wallet().await.unwrap_err();
    assert!(matches!(err, VaultError::TxReverted { .. }));
    assert!(h.stored(&record_key(&h)).await.is_none());
    assert!(!h.client.custodian().has_wallet().await);
    assert!(h.chain.vault_entry(h.main_address()).is_none());
}

#[tokio::test]
async fn test_rejected_store_is_user_rejection() {
    let h = Harness::new().await;
    h.wallet.reject_transactions(true);
    let err = h.client.custodian().create_wallet().await.unwrap_err();
    assert!(err.is_user_rejection());
    assert!(h.stored(&record_key(&h)).await.is_none());
}

#[tokio::test]
async fn test_vault_not_configured() {
    let mut h = Harness::new().await;
    h.config.hardhat.contracts.wallet_vault = None;
    let h = h.restart().await;
    let err = h.client.custodian().create_wallet().await.unwrap_err();
    assert!(matches!(err, VaultError::VaultNotConfigured { .. }));
}

#[tokio::test]
async fn test_retrieved_key_matches_created_wallet() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let address = h.client.custodian().create_wallet().await.unwrap();

    let reloaded = h.restart().await;
    assert_eq!(reloaded.client.custodian().address().await, Some(address));
    assert!(!reloaded.client.custodian().is_loaded().await);

    let key = reloaded.client.custodian().retrieve_from_chain().await.unwrap();
    let signer = LocalWallet::from_str(key.trim_start_matches("0x")).unwrap();
    assert_eq!(signer.address(), address);
    assert!(reloaded.client.custodian().is_loaded().await);
    // The stored session record covered the vault: no new prompt.
    assert_eq!(h.wallet.sign_prompts(), 1);
}

#[tokio::test]
async fn test_retrieve_without_stored_key() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let err = h.client.custodian().retrieve_from_chain().await.unwrap_err();
    assert!(matches!(err, VaultError::NoStoredKey));
}

#[tokio::test]
async fn test_send_eth_signs_locally() {
    let h = Harness::new().await;
    let custodian = h.client.custodian();
    let address = custodian.create_wallet().await.unwrap();
    h.chain.fund(address, parse_ether("1").unwrap());
    let prompts = h.wallet.tx_prompts();

    let to = Address::repeat_byte(0x42);
    let receipt = custodian.send_eth(to, "0.25").await.unwrap();
    assert_eq!(receipt.status.map(|s| s.as_u64()), Some(1));
    assert_eq!(h.chain.raw_transactions.load(Ordering::SeqCst), 1);
    assert_eq!(h.wallet.tx_prompts(), prompts);
    assert_eq!(custodian.balance().await.as_deref(), Some("0.7500"));

    let err = custodian.send_eth(to, "lots").await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_call_contract_uses_session_wallet() {
    let h = Harness::new().await;
    let custodian = h.client.custodian();
    let address = custodian.create_wallet().await.unwrap();

    let receipt = custodian
        .call_contract(
            Address::repeat_byte(0x55),
            Bytes::from(vec![0xde, 0xad]),
            U256::zero(),
            Some(50_000),
        )
        .await
        .unwrap();
    assert_eq!(receipt.from, address);
}

#[tokio::test]
async fn test_gameplay_through_session_wallet() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let session_wallet = h.client.custodian().create_wallet().await.unwrap();
    h.client.use_session_wallet().await;
    let prompts = h.wallet.tx_prompts();

    let game = h.client.game();
    let game_id = game.create_game(1, &distinct_deck()).await.unwrap();
    assert_eq!(h.chain.game(game_id).unwrap().creator, session_wallet);
    assert_eq!(game.decrypt_hand().await.unwrap().len(), 5);
    game.play_card(0, 1, 1).await.unwrap();
    game.end_turn().await.unwrap();

    assert_eq!(h.wallet.tx_prompts(), prompts);
    assert_eq!(h.chain.raw_transactions.load(Ordering::SeqCst), 3);

    h.client.use_main_wallet().await;
    game.resign().await.unwrap();
    assert_eq!(h.wallet.tx_prompts(), prompts + 1);
}

#[tokio::test]
async fn test_balance_requires_wallet() {
    let h = Harness::new().await;
    let err = h.client.custodian().refresh_balance().await.unwrap_err();
    assert!(matches!(err, VaultError::WalletNotLoaded));
}
