// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GameSession contract ABI
//!
//! Only the generated call/return/event types are used. Calldata is encoded
//! directly and submitted through whichever sender the client holds, so no
//! provider-bound contract instance is ever constructed.

use ethers::prelude::abigen;

abigen!(
    GameSession,
    r#"[
        function createGame(uint256 generalCardId, bytes32[] encryptedDeck, bytes inputProof) returns (uint256)
        function createSinglePlayerGame(uint256 gameId, uint256 generalCardId, bytes32[] encryptedDeck, bytes inputProof)
        function joinGame(uint256 gameId, uint256 generalCardId, bytes32[] encryptedDeck, bytes inputProof)
        function completeMulligan(uint256 gameId, bool[5] mulliganSlots)
        function getCardFromDeck(uint256 gameId, uint8 index) view returns (bytes32)
        function getHand(uint256 gameId) view returns (bytes32[] handles, uint8 handSize)
        function playCard(uint256 gameId, uint8 handSlot, uint16 cardId, bytes decryptionProof, uint8 x, uint8 y)
        function replaceCard(uint256 gameId, uint8 handSlot)
        function endTurn(uint256 gameId)
        function resign(uint256 gameId)
        function moveUnit(uint256 gameId, uint8 fromX, uint8 fromY, uint8 toX, uint8 toY)
        function attack(uint256 gameId, uint8 attackerX, uint8 attackerY, uint8 targetX, uint8 targetY)
        function getGameState(uint256 gameId) view returns (uint8 state, uint8 currentTurn, uint8 turnNumber, address creator, address opponent, address winner)
        function getPlayerInfo(uint256 gameId, uint8 playerIndex) view returns (address wallet, uint8 handSize, uint8 deckRemaining, uint8 mana, uint8 maxMana, uint16 generalHp)
        function getBoardUnit(uint256 gameId, uint8 x, uint8 y) view returns (uint16 cardId, uint8 owner, uint8 atk, uint8 hp, bool exists)
        event GameCreated(uint256 indexed gameId, address indexed creator)
        event PlayerJoined(uint256 indexed gameId, address indexed opponent)
        event CardDrawn(uint256 indexed gameId, uint8 playerIndex)
        event CardPlayed(uint256 indexed gameId, uint8 playerIndex, uint16 cardId, uint8 x, uint8 y)
        event GameEnded(uint256 indexed gameId, address winner)
    ]"#
);
