// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::common::Harness;
use fheight_session::crypto::{fallback_keypair, KeyMaterial};
use fheight_session::storage::KeyValueStore;

#[test]
fn test_key_material_formats() {
    assert!(KeyMaterial::binary(vec![4; 65]).is_valid_format());
    assert!(!KeyMaterial::Hex(format!("0x04{}", "ab".repeat(64))).is_valid_format());
    assert!(KeyMaterial::Hex("f".repeat(1001)).is_valid_format());
    assert!(!KeyMaterial::Hex("f".repeat(64)).is_valid_format());
    assert!(KeyMaterial::Object(serde_json::Map::new()).is_valid_format());
}

#[test]
fn test_fallback_keypair_is_uncompressed_point() {
    let keypair = fallback_keypair();
    let public = keypair.public_key.to_hex();
    assert!(public.starts_with("0x04"));
    assert_eq!(public.len(), 2 + 130);
    assert_eq!(keypair.private_key.to_bytes().unwrap().len(), 32);
}

#[tokio::test]
async fn test_legacy_record_is_cleared_on_load() {
    let h = Harness::new().await;
    h.client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();

    let raw = h.stored("fheight_fhe_session").await.unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    json["publicKey"] = serde_json::Value::String(format!("0x04{}", "cd".repeat(64)));
    h.store
        .set("fheight_fhe_session", &json.to_string())
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

    let raw = h.stored("fheight_fhe_session").await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["publicKey"]["type"], "Buffer");
}

#[tokio::test]
async fn test_stored_public_key_round_trips_as_buffer() {
    let h = Harness::new().await;
    let init = h
        .client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    let reloaded = h.restart().await;
    reloaded
        .client
        .session()
        .initialize_session(&h.all_contracts())
        .await
        .unwrap();
    assert_eq!(
        reloaded.client.session().public_key().await,
        Some(init.public_key)
    );
}
