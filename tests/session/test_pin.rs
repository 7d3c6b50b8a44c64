// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::common::{Harness, DAY_MS, START_MS};
use fheight_session::crypto::PinEnvelope;
use fheight_session::session::SessionError;

#[tokio::test]
async fn test_sealed_record_hides_session_material() {
    let h = Harness::new().await;
    let init = h
        .client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "4821")
        .await
        .unwrap();
    assert!(!init.from_cache);

    let raw = h.stored("fheight_fhe_session").await.unwrap();
    let envelope: PinEnvelope = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope.version, 2);
    assert_eq!(envelope.expiry, Some(START_MS + DAY_MS));
    assert!(!raw.contains(&init.signature[2..]));
    assert!(!raw.contains("publicKey"));
}

#[tokio::test]
async fn test_pin_unlocks_on_reload() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "4821")
        .await
        .unwrap();

    let reloaded = h.restart().await;
    let session = reloaded.client.session();
    assert!(session.has_stored_session().await.unwrap());

    let init = session
        .initialize_session_with_pin(&h.all_contracts(), "4821")
        .await
        .unwrap();
    assert!(init.from_cache);
    assert_eq!(h.wallet.sign_prompts(), 1);
    assert!(session.is_session_valid().await);
}

#[tokio::test]
async fn test_wrong_pin_is_reported_and_record_kept() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "4821")
        .await
        .unwrap();
    let stored = h.stored("fheight_fhe_session").await;

    let reloaded = h.restart().await;
    let err = reloaded
        .client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "0000")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::WrongPin));
    assert_eq!(h.stored("fheight_fhe_session").await, stored);
    assert_eq!(h.wallet.sign_prompts(), 1);
}

#[tokio::test]
async fn test_expired_envelope_is_cleared_without_pin() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "4821")
        .await
        .unwrap();

    h.clock.advance_ms(DAY_MS + 1);
    let reloaded = h.restart().await;
    assert!(!reloaded.client.session().has_stored_session().await.unwrap());

    let init = reloaded
        .client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "wrong-but-irrelevant")
        .await
        .unwrap();
    assert!(!init.from_cache);
    assert_eq!(h.wallet.sign_prompts(), 2);
}

#[tokio::test]
async fn test_sealed_record_is_not_used_without_pin() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session_with_pin(&h.all_contracts(), "4821")
        .await
        .unwrap();

    let reloaded = h.restart().await;
    let init = reloaded
        .client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    assert!(!init.from_cache);
    assert_eq!(h.wallet.sign_prompts(), 2);
}
