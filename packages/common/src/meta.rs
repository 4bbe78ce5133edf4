use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::BnetGameType;

/// Number of cards in a complete Hearthstone deck list.
pub const DECK_SIZE: usize = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("friendly_player must be 1 or 2, got {0}")]
    InvalidFriendlyPlayer(i16),
    #[error("player {player_id} deck list has {len} cards, expected {DECK_SIZE}")]
    InvalidDeckLength { player_id: i16, len: usize },
    #[error("server_port {0} is out of range")]
    InvalidServerPort(i64),
}

/// Per-player fields declared by the uploading client.
///
/// Everything here is self-reported; the parser-derived player rows
/// take precedence wherever both exist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMeta {
    #[serde(default)]
    pub name: Option<String>,
    /// 1 through 25, or 0 for legend.
    #[serde(default)]
    pub rank: Option<i16>,
    #[serde(default)]
    pub legend_rank: Option<i32>,
    #[serde(default)]
    pub stars: Option<i32>,
    #[serde(default)]
    pub wins: Option<i32>,
    #[serde(default)]
    pub losses: Option<i32>,
    /// Full 30-card deck list, when the client knows it.
    #[serde(default)]
    pub deck: Option<Vec<String>>,
    #[serde(default)]
    pub cardback: Option<i32>,
}

/// Client-declared upload metadata, validated once at the ingress
/// boundary. All fields are optional except the match start hint;
/// the pipeline decides per-field how to fall back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMeta {
    /// Client-side clock reading at match start. Used as the parser
    /// hint timestamp and the deduplication candidate time.
    pub match_start_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub hearthstone_build: Option<i32>,
    #[serde(default)]
    pub game_type: Option<BnetGameType>,
    /// Server-assigned game id. Rolls over; never unique on its own.
    #[serde(default)]
    pub game_id: Option<i64>,
    #[serde(default)]
    pub server_ip: Option<String>,
    #[serde(default)]
    pub server_port: Option<i32>,
    /// Server-assigned id of the uploading client's connection.
    #[serde(default)]
    pub client_id: Option<i32>,
    #[serde(default)]
    pub spectate_key: Option<String>,
    #[serde(default)]
    pub spectator_mode: bool,
    #[serde(default)]
    pub reconnecting: bool,
    /// Explicit friendly-player slot (1 or 2) when the client knows it.
    #[serde(default)]
    pub friendly_player: Option<i16>,
    #[serde(default)]
    pub scenario_id: Option<i32>,
    /// Declared ranked ladder season; derived from the match end time
    /// when absent.
    #[serde(default)]
    pub ladder_season: Option<i32>,
    #[serde(default)]
    pub player1: PlayerMeta,
    #[serde(default)]
    pub player2: PlayerMeta,
}

impl UploadMeta {
    pub fn new(match_start_timestamp: DateTime<Utc>) -> Self {
        Self {
            match_start_timestamp,
            hearthstone_build: None,
            game_type: None,
            game_id: None,
            server_ip: None,
            server_port: None,
            client_id: None,
            spectate_key: None,
            spectator_mode: false,
            reconnecting: false,
            friendly_player: None,
            scenario_id: None,
            ladder_season: None,
            player1: PlayerMeta::default(),
            player2: PlayerMeta::default(),
        }
    }

    /// Validate the declared fields. Runs once when an upload is
    /// accepted so the pipeline can rely on the invariants afterwards.
    pub fn validate(&self) -> Result<(), MetaError> {
        if let Some(friendly) = self.friendly_player
            && !(1..=2).contains(&friendly)
        {
            return Err(MetaError::InvalidFriendlyPlayer(friendly));
        }

        for (player_id, player) in [(1i16, &self.player1), (2i16, &self.player2)] {
            if let Some(ref deck) = player.deck
                && deck.len() != DECK_SIZE
            {
                return Err(MetaError::InvalidDeckLength {
                    player_id,
                    len: deck.len(),
                });
            }
        }

        if let Some(port) = self.server_port
            && !(1..=65535).contains(&port)
        {
            return Err(MetaError::InvalidServerPort(port as i64));
        }

        Ok(())
    }

    /// Metadata for the player in the given slot (1 or 2).
    pub fn player(&self, player_id: i16) -> &PlayerMeta {
        if player_id == 1 { &self.player1 } else { &self.player2 }
    }

    /// An upload is only eligible for match unification when the server
    /// handed out both a game id and a client connection id. Without
    /// those, every upload is assumed to describe a distinct match.
    pub fn eligible_for_unification(&self) -> bool {
        self.game_id.is_some() && self.client_id.is_some()
    }
}
