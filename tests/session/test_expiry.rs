// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::common::{Harness, DAY_MS, START_MS};
use ethers::types::Address;
use fheight_session::crypto::{EncryptedInput, FheBackend, MockBackend};
use fheight_session::session::SessionError;

#[tokio::test]
async fn test_valid_until_expiry_then_invalid() {
    let h = Harness::new().await;
    let session = h.client.session();
    assert!(!session.is_session_valid().await);

    session.initialize_session(&h.all_contracts()).await.unwrap();
    assert!(session.is_session_valid().await);

    let info = session.session_info().await.unwrap();
    assert_eq!(info.expiry_ms, Some(START_MS + DAY_MS));

    h.clock.advance_ms(DAY_MS);
    assert!(session.is_session_valid().await, "valid at exactly expiry");

    h.clock.advance_ms(1);
    assert!(!session.is_session_valid().await);

    let handles = MockBackend::new()
        .encrypt(&EncryptedInput::new(h.game_contract(), h.main_address()).add16(3))
        .await
        .unwrap()
        .handles;
    let err = session
        .decrypt(&handles, h.game_contract())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SessionInvalid));
}

#[tokio::test]
async fn test_expired_record_is_cleared_and_replaced() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let before = h.stored("fheight_fhe_session").await.unwrap();

    h.clock.advance_ms(DAY_MS + 1);
    let reloaded = h.restart().await;
    assert!(!reloaded.client.session().has_stored_session().await.unwrap());

    let init = reloaded
        .client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    assert!(!init.from_cache);
    assert_eq!(h.wallet.sign_prompts(), 2);
    assert_ne!(h.stored("fheight_fhe_session").await.unwrap(), before);
}

#[tokio::test]
async fn test_record_without_signed_params_fails_decrypt() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();

    // Strip the signed strings, as records written by older clients lack them.
    let raw = h.stored("fheight_fhe_session").await.unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let obj = json.as_object_mut().unwrap();
    obj.remove("sessionStartTimeStamp");
    obj.remove("sessionDurationDays");
    use fheight_session::storage::KeyValueStore;
    h.store
        .set("fheight_fhe_session", &json.to_string())
        .await
        .unwrap();

    let reloaded = h.restart().await;
    let session = reloaded.client.session();
    let init = session.initialize_session(&h.all_contracts()).await.unwrap();
    assert!(init.from_cache);

    let err = session
        .decrypt(&[ethers::types::H256::repeat_byte(1)], h.game_contract())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ParamsMissing));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_unreadable_record_is_discarded() {
    let h = Harness::new().await;
    use fheight_session::storage::KeyValueStore;
    h.store
        .set("fheight_fhe_session", "{not json")
        .await
        .unwrap();

    let init = h
        .client
        .session()
        .initialize_session(&[Address::repeat_byte(0x33)])
        .await
        .unwrap();
    assert!(!init.from_cache);
    let raw = h.stored("fheight_fhe_session").await.unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
}
