use chrono::{DateTime, Utc};
use common::game_tree::GameTree;
use common::meta::UploadMeta;
use common::{BnetGameType, PlayState};
use serde::{Deserialize, Serialize};

/// Format version stamped into every generated replay document.
pub const REPLAY_DOCUMENT_VERSION: &str = "1.0";

/// One player in a generated replay document. Merges the parsed game
/// tree with the client-declared metadata for that slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPlayer {
    pub player_id: i16,
    pub name: Option<String>,
    pub is_first: bool,
    pub hero_card_id: Option<String>,
    pub hero_premium: bool,
    pub final_state: PlayState,
    pub rank: Option<i16>,
    pub legend_rank: Option<i32>,
    pub cardback: Option<i32>,
    pub deck: Option<Vec<String>>,
}

/// The versioned replay document persisted to the blob store: the full
/// reconstructed game from one point of view, self-contained enough to
/// replay without the relational rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDocument {
    pub version: String,
    pub game_type: BnetGameType,
    pub game_id: Option<i64>,
    pub hearthstone_build: Option<i32>,
    pub reconnecting: bool,
    pub spectator_mode: bool,
    pub friendly_player_id: i16,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub num_turns: i32,
    pub players: Vec<DocumentPlayer>,
}

impl ReplayDocument {
    pub fn build(tree: &GameTree, meta: &UploadMeta, friendly_player_id: i16) -> Self {
        let players = tree
            .players
            .iter()
            .map(|player| {
                let declared = meta.player(player.player_id);
                DocumentPlayer {
                    player_id: player.player_id,
                    name: player.name.clone(),
                    is_first: player.is_first,
                    hero_card_id: player.hero_card_id.clone(),
                    hero_premium: player.hero_premium,
                    final_state: player.final_state,
                    rank: declared.rank,
                    legend_rank: declared.legend_rank,
                    cardback: declared.cardback,
                    deck: declared.deck.clone(),
                }
            })
            .collect();

        Self {
            version: REPLAY_DOCUMENT_VERSION.to_string(),
            game_type: meta.game_type.unwrap_or_default(),
            game_id: meta.game_id,
            hearthstone_build: meta.hearthstone_build,
            reconnecting: meta.reconnecting,
            spectator_mode: meta.spectator_mode,
            friendly_player_id,
            start_time: tree.start_time,
            end_time: tree.end_time,
            num_turns: tree.num_turns,
            players,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::game_tree::ParsedPlayer;

    fn tree() -> GameTree {
        GameTree {
            start_time: Utc.with_ymd_and_hms(2016, 5, 10, 17, 10, 6).unwrap(),
            end_time: Utc.with_ymd_and_hms(2016, 5, 10, 17, 25, 0).unwrap(),
            num_turns: 17,
            entity_ids: vec![1, 2, 3],
            players: vec![
                ParsedPlayer {
                    player_id: 1,
                    name: Some("Garrosh".into()),
                    account_hi: 1,
                    account_lo: 2,
                    is_ai: false,
                    is_first: true,
                    hero_card_id: Some("HERO_01".into()),
                    hero_premium: false,
                    final_state: PlayState::Won,
                    initial_deck_card_ids: vec![],
                    hand: vec![],
                },
                ParsedPlayer {
                    player_id: 2,
                    name: Some("Jaina".into()),
                    account_hi: 1,
                    account_lo: 3,
                    is_ai: false,
                    is_first: false,
                    hero_card_id: Some("HERO_08".into()),
                    hero_premium: true,
                    final_state: PlayState::Lost,
                    initial_deck_card_ids: vec![],
                    hand: vec![],
                },
            ],
        }
    }

    #[test]
    fn merges_declared_player_fields() {
        let mut meta = UploadMeta::new(Utc.with_ymd_and_hms(2016, 5, 10, 17, 10, 6).unwrap());
        meta.player1.rank = Some(18);
        meta.player2.legend_rank = Some(204);

        let doc = ReplayDocument::build(&tree(), &meta, 1);
        assert_eq!(doc.version, REPLAY_DOCUMENT_VERSION);
        assert_eq!(doc.players[0].rank, Some(18));
        assert_eq!(doc.players[1].legend_rank, Some(204));
        assert_eq!(doc.players[0].name.as_deref(), Some("Garrosh"));
    }

    #[test]
    fn serde_roundtrip() {
        let meta = UploadMeta::new(Utc.with_ymd_and_hms(2016, 5, 10, 17, 10, 6).unwrap());
        let doc = ReplayDocument::build(&tree(), &meta, 2);
        let bytes = doc.to_bytes().unwrap();
        let parsed: ReplayDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }
}
