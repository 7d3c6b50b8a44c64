// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::common::Harness;
use fheight_session::session::SessionError;
use fheight_session::vault::VaultError;

#[tokio::test]
async fn test_retrieve_escalates_narrow_session() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&[h.game_contract()])
        .await
        .unwrap();
    assert!(!h.client.session().covers(h.vault_contract()).await);
    let address = h.client.custodian().create_wallet().await.unwrap();
    assert_eq!(h.wallet.sign_prompts(), 1);

    h.client.custodian().retrieve_from_chain().await.unwrap();
    assert_eq!(h.wallet.sign_prompts(), 2);
    assert_eq!(h.client.custodian().address().await, Some(address));

    let covered = h.client.session().authorized_contracts().await;
    assert!(covered.contains(&h.game_contract()));
    assert!(covered.contains(&h.vault_contract()));

    // Already covered: the next retrieval is silent.
    h.client.custodian().retrieve_from_chain().await.unwrap();
    assert_eq!(h.wallet.sign_prompts(), 2);
}

#[tokio::test]
async fn test_retrieve_without_session_initializes_once() {
    let h = Harness::new().await;
    h.client.custodian().create_wallet().await.unwrap();
    assert_eq!(h.wallet.sign_prompts(), 0);

    let reloaded = h.restart().await;
    reloaded.client.custodian().get_private_key().await.unwrap();
    assert_eq!(h.wallet.sign_prompts(), 1);
    // In memory now.
    reloaded.client.custodian().get_private_key().await.unwrap();
    assert_eq!(h.wallet.sign_prompts(), 1);
}

#[tokio::test]
async fn test_declined_escalation_keeps_key_locked() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&[h.game_contract()])
        .await
        .unwrap();
    h.client.custodian().create_wallet().await.unwrap();

    let reloaded = h.restart().await;
    reloaded
        .client
        .session()
        .initialize_session(&[h.game_contract()])
        .await
        .unwrap();
    h.wallet.reject_signatures(true);

    let err = reloaded
        .client
        .custodian()
        .retrieve_from_chain()
        .await
        .unwrap_err();
    assert!(err.is_user_rejection());
    assert!(matches!(
        err,
        VaultError::Session(SessionError::UserRejected)
    ));
    assert!(!reloaded.client.custodian().is_loaded().await);
}
