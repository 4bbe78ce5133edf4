use sea_orm::*;
use sea_query::{Index, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{game_replay, global_game, pending_replay_claim};

/// Create the uniqueness safety net and query indexes.
///
/// Concurrent workers are serialized by these constraints rather than
/// by row locks: the unique indexes are what stops two racing uploads
/// from creating two replays for the same (credential, game) pair.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // The duplicate-upload guard: one replay per credential per game.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_game_replay_token_game")
        .table(game_replay::Entity)
        .col(game_replay::Column::UploadTokenId)
        .col(game_replay::Column::GlobalGameId)
        .to_string(PostgresQueryBuilder);
    execute_index(db, "idx_game_replay_token_game", &stmt).await;

    // One pending claim per (replay, token) pair.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_pending_claim_replay_token")
        .table(pending_replay_claim::Entity)
        .col(pending_replay_claim::Column::ReplayId)
        .col(pending_replay_claim::Column::TokenId)
        .to_string(PostgresQueryBuilder);
    execute_index(db, "idx_pending_claim_replay_token", &stmt).await;

    // Deduplication candidate lookup:
    // SELECT ... WHERE game_server_game_id = ? AND ... AND
    //   match_start_timestamp BETWEEN ? AND ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_global_game_dedup")
        .table(global_game::Entity)
        .col(global_game::Column::GameServerGameId)
        .col(global_game::Column::MatchStartTimestamp)
        .to_string(PostgresQueryBuilder);
    execute_index(db, "idx_global_game_dedup", &stmt).await;

    // POV-duplicate lookup under a known global game.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_game_replay_game_client")
        .table(game_replay::Entity)
        .col(game_replay::Column::GlobalGameId)
        .col(game_replay::Column::GameServerClientId)
        .to_string(PostgresQueryBuilder);
    execute_index(db, "idx_game_replay_game_client", &stmt).await;

    Ok(())
}

async fn execute_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => {
            info!("Ensured index {name} exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index {name}: {e}");
        }
    }
}
