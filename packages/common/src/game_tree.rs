use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::PlayState;

/// The log parser could not tokenize the raw log at all.
#[derive(Debug, Error, Clone)]
#[error("log parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An entity observed entering a player's hand zone.
///
/// The card id is absent when the log never revealed which card the
/// entity is (the hand hidden from the recording client).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandEntity {
    pub entity_id: i32,
    #[serde(default)]
    pub card_id: Option<String>,
}

/// One player's slice of the parsed game tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPlayer {
    /// Player slot, 1 or 2.
    pub player_id: i16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_hi: i64,
    #[serde(default)]
    pub account_lo: i64,
    #[serde(default)]
    pub is_ai: bool,
    #[serde(default)]
    pub is_first: bool,
    #[serde(default)]
    pub hero_card_id: Option<String>,
    #[serde(default)]
    pub hero_premium: bool,
    #[serde(default)]
    pub final_state: PlayState,
    /// Card ids observed entering this player's starting deck zone.
    /// Usually partial; a full list only exists for the friendly side.
    #[serde(default)]
    pub initial_deck_card_ids: Vec<String>,
    /// Entities revealed into this player's hand, in log order.
    #[serde(default)]
    pub hand: Vec<HandEntity>,
}

/// One fully parsed game from a raw log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTree {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub num_turns: i32,
    /// Ids of every entity the log created.
    pub entity_ids: Vec<i32>,
    pub players: Vec<ParsedPlayer>,
}

impl GameTree {
    /// Entity count, derived from the highest entity id seen.
    pub fn num_entities(&self) -> i32 {
        self.entity_ids.iter().copied().max().unwrap_or(0)
    }

    pub fn player(&self, player_id: i16) -> Option<&ParsedPlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Guess which slot the recording client was playing as: the side
    /// whose hand received an entity with no revealed card id. Returns
    /// `None` when zero or both sides qualify; callers must treat that
    /// as a failure rather than defaulting.
    pub fn guess_friendly_player(&self) -> Option<i16> {
        let mut candidate = None;
        for player in &self.players {
            if player.hand.iter().any(|e| e.card_id.is_none()) {
                if candidate.is_some() {
                    return None;
                }
                candidate = Some(player.player_id);
            }
        }
        candidate
    }
}

/// Result of parsing one raw log blob. A log can in principle carry
/// several games; the ingestion pipeline requires exactly one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLog {
    pub games: Vec<GameTree>,
}

/// Contract for the log-parsing collaborator.
///
/// Parsing is CPU-bound and roughly proportional to log length; the
/// hint timestamp anchors relative log times to a wall clock.
pub trait LogParser: Send + Sync {
    fn parse(&self, raw: &[u8], hint: DateTime<Utc>) -> Result<ParsedLog, ParseError>;
}

/// Parser for logs already shipped in the structured interchange form.
/// Also the parser of choice in tests, where game trees are fabricated
/// directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLogParser;

impl LogParser for JsonLogParser {
    fn parse(&self, raw: &[u8], _hint: DateTime<Utc>) -> Result<ParsedLog, ParseError> {
        serde_json::from_slice(raw).map_err(|e| ParseError::new(e.to_string()))
    }
}
