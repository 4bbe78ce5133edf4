use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A canonicalized deck list, shared by every player row describing
/// the same cards. The digest is a pure function of the sorted card-id
/// multiset, so resubmitting an equivalent list resolves to this row
/// instead of creating a duplicate.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deck")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// SHA-256 over the sorted card-id list.
    #[sea_orm(unique)]
    pub digest: String,

    /// Sorted card ids, one entry per copy. May be partial when only
    /// observed cards are known.
    #[sea_orm(column_type = "JsonBinary")]
    pub card_ids: serde_json::Value,

    pub created: DateTimeUtc,

    #[sea_orm(has_many)]
    pub players: HasMany<super::global_game_player::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
