use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Associates an upload credential with a replay until the credential
/// gains a real user. Unique per (replay, token); deleted the moment
/// the credential is bound, when ownership of all its pending replays
/// transfers in one transaction.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_replay_claim")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub replay_id: i64,
    #[sea_orm(belongs_to, from = "replay_id", to = "id")]
    pub replay: HasOne<super::game_replay::Entity>,

    #[sea_orm(indexed)]
    pub token_id: String,
    #[sea_orm(belongs_to, from = "token_id", to = "key")]
    pub token: HasOne<super::auth_token::Entity>,

    pub created: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
