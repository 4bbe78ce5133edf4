use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One uploader's point-of-view recording of a global game.
///
/// Different uploads of the same match can carry different information:
/// a spectator watching both players sees every hand, a replay from a
/// Real ID friend shows real names, a spectator who joined late has
/// fewer turns. The pair (upload credential, global game) is unique —
/// that is the duplicate-upload guard.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_replay")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Public identifier used in URLs.
    #[sea_orm(unique)]
    pub shortid: Uuid,

    /// Credential the replay was uploaded with; NULL for manual
    /// ingests.
    pub upload_token_id: Option<String>,
    #[sea_orm(belongs_to, from = "upload_token_id", to = "key")]
    pub upload_token: Option<super::auth_token::Entity>,

    /// Owning user; NULL until the credential resolves to an account.
    pub user_id: Option<i64>,

    pub global_game_id: i64,
    #[sea_orm(belongs_to, from = "global_game_id", to = "id")]
    pub global_game: HasOne<super::global_game::Entity>,

    /// Spectated recordings can see both hands.
    #[sea_orm(default_value = false)]
    pub is_spectated_game: bool,

    /// Slot (1 or 2) of the player whose cards sit at the bottom of
    /// the screen when watching this replay.
    pub friendly_player_id: i16,

    /// Connection metadata from the Net.log ConnectAPI.
    pub game_server_client_id: Option<i32>,
    pub game_server_spectate_key: Option<String>,

    /// Blob key of the generated replay document. The blob store does
    /// not cascade; deleting the row must delete the blob too.
    pub replay_document_key: Option<String>,

    /// Document format version of the generated replay.
    pub document_version: String,

    /// Uploader requested deletion.
    #[sea_orm(default_value = false)]
    pub is_deleted: bool,

    #[sea_orm(default_value = false)]
    pub exclude_in_aggregate_stats: bool,

    /// Outcome for the friendly player. NULL when the recording ended
    /// mid-game; ties count as a loss.
    pub won: Option<bool>,

    #[sea_orm(default_value = false)]
    pub disconnected: bool,
}

impl ActiveModelBehavior for ActiveModel {}
