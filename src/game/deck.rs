// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deck preparation before encryption

use rand::rngs::OsRng;
use rand::RngCore;

pub const DECK_SIZE: usize = 40;
pub const INITIAL_HAND_SIZE: usize = 5;
pub const MAX_HAND_SIZE: usize = 6;
pub const MULLIGAN_SLOTS: usize = 5;

/// Neutral filler used when a deck has no cards at all.
pub const PLACEHOLDER_CARD_ID: u16 = 1;

/// Pads to exactly [`DECK_SIZE`] by repeating the deck round-robin, or
/// truncates longer decks.
pub fn pad_deck(cards: &[u16]) -> Vec<u16> {
    if cards.is_empty() {
        return vec![PLACEHOLDER_CARD_ID; DECK_SIZE];
    }
    cards.iter().copied().cycle().take(DECK_SIZE).collect()
}

/// In-place Fisher–Yates. Each swap index comes from a fresh 32-bit OS
/// random draw.
pub fn shuffle(cards: &mut [u16]) {
    let mut rng = OsRng;
    for i in (1..cards.len()).rev() {
        let j = (rng.next_u32() as usize) % (i + 1);
        cards.swap(i, j);
    }
}

/// Padded and shuffled, ready for encryption.
pub fn prepare_deck(cards: &[u16]) -> Vec<u16> {
    let mut deck = pad_deck(cards);
    shuffle(&mut deck);
    deck
}
