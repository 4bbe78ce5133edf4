use common::BnetGameType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The single canonical record of one physical match, as seen from the
/// game server's point of view. Every upload of that match, from any
/// player or spectator, shares a reference to one row here.
///
/// For deduplication a game is identified by the tuple (build, game
/// type, server game id, server address, server port) plus a match
/// start timestamp inside a symmetric tolerance window, never by
/// primary key alone. Rows are not mutated after creation except by
/// attaching player/replay children.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "global_game")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Server-assigned game id from the Net.log. Appears to roll over
    /// and reset periodically, so it is never unique on its own.
    pub game_server_game_id: Option<i64>,

    pub game_server_address: Option<String>,

    pub game_server_port: Option<i32>,

    /// Patch number at the time the game was played.
    pub hearthstone_build: Option<i32>,

    /// Encodes ranked/casual as well as standard/wild.
    pub game_type: BnetGameType,

    pub match_start_timestamp: DateTimeUtc,

    pub match_end_timestamp: DateTimeUtc,

    /// Ranked ladder season, derived from the match timestamp when the
    /// uploader declared nothing. NULL for non-ladder games.
    pub ladder_season: Option<i32>,

    /// Tavern Brawl season; increments every week the brawl changes.
    /// No way to derive this yet.
    #[sea_orm(default_value = 0)]
    pub brawl_season: i32,

    /// ID from DBF/SCENARIO.xml or the scenario cache.
    pub scenario_id: Option<i32>,

    pub num_turns: i32,

    pub num_entities: i32,

    #[sea_orm(has_many)]
    pub players: HasMany<super::global_game_player::Entity>,

    #[sea_orm(has_many)]
    pub replays: HasMany<super::game_replay::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
