use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An upload credential. Issued before any account exists; `user_id`
/// is filled in later when the identity provider binds the credential
/// to a real user, at which point pending replay claims transfer.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auth_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    pub user_id: Option<i64>,

    pub created: DateTimeUtc,

    #[sea_orm(has_many)]
    pub claims: HasMany<super::pending_replay_claim::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
