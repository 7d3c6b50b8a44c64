// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persisted session shapes
//!
//! Version 1 is the plain record, version 2 wraps the same JSON in a
//! [`PinEnvelope`]. Both live under one storage key.

use super::SessionError;
use crate::crypto::{KeyMaterial, PinEnvelope, SessionKeypair};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

pub const RECORD_VERSION: u8 = 1;
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

fn default_version() -> u8 {
    RECORD_VERSION
}

/// A signed authorization and the exact strings it was signed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAuthorization {
    /// `0x`-prefixed, as the wallet returned it.
    pub signature: String,
    pub contracts: Vec<Address>,
    pub start_time_ms: i64,
    pub expiry_ms: Option<i64>,
    pub start_timestamp: Option<String>,
    pub duration_days: Option<String>,
}

impl SessionAuthorization {
    /// `now > start + duration`; records without an expiry never expire.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expiry_ms, Some(expiry) if now_ms > expiry)
    }

    pub fn covers(&self, contract: Address) -> bool {
        self.contracts.contains(&contract)
    }

    pub fn covers_all(&self, contracts: &[Address]) -> bool {
        !self.contracts.is_empty() && contracts.iter().all(|c| self.covers(*c))
    }

    pub fn signature_prefix(&self) -> &str {
        let end = self.signature.len().min(10);
        &self.signature[..end]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub public_key: KeyMaterial,
    pub private_key: KeyMaterial,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub expiry: Option<i64>,
    #[serde(default)]
    pub contract_addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_time_stamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration_days: Option<String>,
    #[serde(default = "default_version")]
    pub version: u8,
}

impl SessionRecord {
    pub fn new(keypair: &SessionKeypair, auth: &SessionAuthorization) -> Self {
        Self {
            public_key: keypair.public_key.clone(),
            private_key: keypair.private_key.clone(),
            signature: Some(auth.signature.clone()),
            start_time: Some(auth.start_time_ms),
            expiry: auth.expiry_ms,
            contract_addresses: auth.contracts.clone(),
            session_start_time_stamp: auth.start_timestamp.clone(),
            session_duration_days: auth.duration_days.clone(),
            version: RECORD_VERSION,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expiry, Some(expiry) if now_ms > expiry)
    }

    pub fn has_valid_key_format(&self) -> bool {
        self.public_key.is_valid_format()
    }

    pub fn keypair(&self) -> SessionKeypair {
        SessionKeypair {
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
        }
    }

    /// `None` when the record never carried a signature.
    pub fn authorization(&self) -> Option<SessionAuthorization> {
        let signature = self.signature.clone()?;
        Some(SessionAuthorization {
            signature,
            contracts: self.contract_addresses.clone(),
            start_time_ms: self.start_time.unwrap_or_default(),
            expiry_ms: self.expiry,
            start_timestamp: self.session_start_time_stamp.clone(),
            duration_days: self.session_duration_days.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::InvalidRecord(e.to_string()))
    }
}

/// Whatever sits under the session storage key.
#[derive(Debug, Clone)]
pub enum StoredSession {
    Plain(SessionRecord),
    Sealed(PinEnvelope),
}

impl StoredSession {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| SessionError::InvalidRecord(e.to_string()))?;

        let sealed = value.get("version").and_then(|v| v.as_u64()) == Some(2)
            && value.get("encrypted").is_some();
        if sealed {
            let envelope: PinEnvelope = serde_json::from_value(value)
                .map_err(|e| SessionError::InvalidRecord(e.to_string()))?;
            return Ok(StoredSession::Sealed(envelope));
        }

        if value.get("publicKey").is_none() {
            return Err(SessionError::InvalidRecord(
                "neither a sealed envelope nor a session record".to_string(),
            ));
        }
        let record: SessionRecord = serde_json::from_value(value)
            .map_err(|e| SessionError::InvalidRecord(e.to_string()))?;
        Ok(StoredSession::Plain(record))
    }

    pub fn expiry(&self) -> Option<i64> {
        match self {
            StoredSession::Plain(record) => record.expiry,
            StoredSession::Sealed(envelope) => envelope.expiry,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expiry(), Some(expiry) if now_ms > expiry)
    }
}
