use common::PlayState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One of the two players of a global game, as reconstructed from the
/// first upload that created the game. Slot values are exactly 1 and
/// 2, at most one row per slot per game.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "global_game_player")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub game_id: i64,
    #[sea_orm(belongs_to, from = "game_id", to = "id")]
    pub game: HasOne<super::global_game::Entity>,

    /// Player slot, 1 or 2.
    pub player_id: i16,

    /// Display name as the recording client saw it. A BattleTag, or a
    /// real name when the uploader and player are Real ID friends.
    pub name: String,

    /// Real-name variant when a different upload revealed it.
    pub real_name: Option<String>,

    /// Region value from the account hi/lo pair.
    pub account_hi: i64,

    /// Account ID value from the account hi/lo pair.
    pub account_lo: i64,

    #[sea_orm(default_value = false)]
    pub is_ai: bool,

    pub is_first: bool,

    /// 1 through 25, or 0 for legend.
    pub rank: Option<i16>,

    pub legend_rank: Option<i32>,

    pub stars: Option<i32>,

    pub wins: Option<i32>,

    pub losses: Option<i32>,

    /// Card id of the starting hero.
    pub hero_card_id: String,

    /// Whether the initial hero is golden.
    #[sea_orm(default_value = false)]
    pub hero_premium: bool,

    pub final_state: PlayState,

    /// As much as is known of the player's starting deck list.
    pub deck_id: i64,
    #[sea_orm(belongs_to, from = "deck_id", to = "id")]
    pub deck: HasOne<super::deck::Entity>,

    /// True if the row was created while unifying a duplicate upload.
    #[sea_orm(default_value = false)]
    pub duplicated: bool,
}

impl ActiveModelBehavior for ActiveModel {}
