use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, SqlErr};

use crate::entity::auth_token;

/// Resolves an upload credential to a user, when one is known.
///
/// Binding credentials to users happens outside this core; whenever a
/// new binding occurs the owner must call
/// [`crate::claims::bind_token_to_user`] so pending claims transfer.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token_key: &str) -> Result<Option<i64>, DbErr>;
}

/// Identity provider backed by the `auth_token` table.
pub struct DbIdentityProvider {
    db: DatabaseConnection,
}

impl DbIdentityProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for DbIdentityProvider {
    async fn resolve(&self, token_key: &str) -> Result<Option<i64>, DbErr> {
        let token = auth_token::Entity::find_by_id(token_key).one(&self.db).await?;
        Ok(token.and_then(|t| t.user_id))
    }
}

/// Fetch a credential row, creating an unbound one on first sight.
pub async fn get_or_create_token(
    db: &DatabaseConnection,
    token_key: &str,
) -> Result<auth_token::Model, DbErr> {
    if let Some(existing) = auth_token::Entity::find_by_id(token_key).one(db).await? {
        return Ok(existing);
    }

    let model = auth_token::ActiveModel {
        key: Set(token_key.to_string()),
        user_id: Set(None),
        created: Set(Utc::now()),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(inserted) => Ok(inserted),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            auth_token::Entity::find_by_id(token_key)
                .one(db)
                .await?
                .ok_or_else(|| {
                    DbErr::Custom("Token key conflict but existing row not found".to_string())
                })
        }
        Err(e) => Err(e),
    }
}
