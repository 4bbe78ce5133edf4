use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use crate::entity::{auth_token, game_replay, pending_replay_claim};

/// Transfer every pending replay claim of a credential to the given
/// user. All-or-nothing per credential: runs in a single transaction,
/// so a failure mid-transfer leaves every claim in place.
///
/// Returns the number of replays re-owned.
pub async fn claim_account(
    db: &DatabaseConnection,
    token_key: &str,
    user_id: i64,
) -> Result<u64, DbErr> {
    let txn = db.begin().await?;
    let transferred = transfer_claims(&txn, token_key, user_id).await?;
    txn.commit().await?;

    if transferred > 0 {
        info!(token = token_key, user_id, transferred, "Transferred pending replay claims");
    }

    Ok(transferred)
}

/// The transfer itself, on whatever connection the caller provides.
/// `claim_account` wraps this in the per-credential transaction.
pub async fn transfer_claims<C: ConnectionTrait>(
    conn: &C,
    token_key: &str,
    user_id: i64,
) -> Result<u64, DbErr> {
    let claims = pending_replay_claim::Entity::find()
        .filter(pending_replay_claim::Column::TokenId.eq(token_key))
        .all(conn)
        .await?;

    for claim in &claims {
        game_replay::Entity::update_many()
            .col_expr(game_replay::Column::UserId, Expr::value(Some(user_id)))
            .filter(game_replay::Column::Id.eq(claim.replay_id))
            .exec(conn)
            .await?;
    }

    pending_replay_claim::Entity::delete_many()
        .filter(pending_replay_claim::Column::TokenId.eq(token_key))
        .exec(conn)
        .await?;

    Ok(claims.len() as u64)
}

/// Hook called when the identity provider newly binds a credential to
/// a user: record the binding, then resolve the credential's pending
/// claims.
pub async fn bind_token_to_user(
    db: &DatabaseConnection,
    token_key: &str,
    user_id: i64,
) -> Result<u64, DbErr> {
    let token = auth_token::Entity::find_by_id(token_key)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::Custom(format!("Auth token {token_key} not found")))?;

    let mut active: auth_token::ActiveModel = token.into();
    active.user_id = Set(Some(user_id));
    active.update(db).await?;

    claim_account(db, token_key, user_id).await
}

/// Resolve leftover claims for every credential that already has a
/// user. Normally claims transfer at binding time; this sweep is the
/// operator-run safety net for claims that slipped through.
pub async fn sweep_unclaimed(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let bound_tokens = auth_token::Entity::find()
        .filter(auth_token::Column::UserId.is_not_null())
        .all(db)
        .await?;

    let mut total = 0u64;
    for token in bound_tokens {
        let Some(user_id) = token.user_id else {
            continue;
        };
        let transferred = claim_account(db, &token.key, user_id).await?;
        if transferred > 0 {
            info!(token = token.key, user_id, transferred, "Swept unclaimed replays");
        }
        total += transferred;
    }

    Ok(total)
}
