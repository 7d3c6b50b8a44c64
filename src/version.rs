// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the FHEIGHT session client

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-session-wallet-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "eip712-session-keys",
    "pin-sealed-sessions",
    "encrypted-decks",
    "lazy-hand-decrypt",
    "session-wallet-vault",
    "mock-fhe-backend",
    "relayer-bridge",
];

/// Supported chain IDs
pub const SUPPORTED_CHAINS: &[u64] = &[
    11155111, // Sepolia
    31337,    // Hardhat
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("FHEIGHT session client {} ({})", VERSION_NUMBER, BUILD_DATE)
}

pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "chains": SUPPORTED_CHAINS,
    })
}
