use chrono::{DateTime, Datelike, Duration, Utc};
use common::game_tree::GameTree;
use common::meta::UploadMeta;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, info};

use crate::entity::{game_replay, global_game};
use crate::error::ProcessingError;

/// How the deduplication engine resolved an upload to a global game.
#[derive(Debug)]
pub enum GameResolution {
    /// No candidate matched (or the upload was not eligible for
    /// unification); a fresh global game was created.
    Created(global_game::Model),
    /// Exactly one existing global game matched; this upload is a new
    /// point of view on it.
    Unified(global_game::Model),
    /// The matched global game already has a replay from this exact
    /// vantage point. The caller must return it unchanged instead of
    /// building a second one.
    AlreadyProcessed {
        game: global_game::Model,
        replay: game_replay::Model,
    },
}

/// The symmetric tolerance range around a match-start timestamp inside
/// which two uploads can describe the same match. The window is wide
/// to absorb client/server clock drift, not network latency.
pub fn deduplication_time_range(
    ts: DateTime<Utc>,
    window: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (ts - window, ts + window)
}

/// Ranked ladder season for a timestamp: seasons are calendar months,
/// season 1 being January 2014.
pub fn guess_ladder_season(timestamp: DateTime<Utc>) -> i32 {
    let months = (timestamp.year() - 2014) * 12 + timestamp.month0() as i32;
    1 + months
}

/// Find or create the canonical global game for an upload.
///
/// Matching only happens when the client supplied both a server game
/// id and a server client id; otherwise every upload is assumed to
/// describe a distinct match. Candidates must agree on the exact-match
/// tuple (build, game type, server game id, address, port) and fall
/// inside the tolerance window around the parsed start time. More than
/// one candidate means corrupted or colliding data and is fatal, never
/// silently resolved.
pub async fn resolve_global_game<C: ConnectionTrait>(
    db: &C,
    meta: &UploadMeta,
    tree: &GameTree,
    window: Duration,
) -> Result<GameResolution, ProcessingError> {
    if !meta.eligible_for_unification() {
        let game = create_global_game(db, meta, tree).await?;
        return Ok(GameResolution::Created(game));
    }

    let (range_start, range_end) = deduplication_time_range(tree.start_time, window);

    let mut select = global_game::Entity::find()
        .filter(global_game::Column::GameType.eq(meta.game_type.unwrap_or_default()))
        .filter(global_game::Column::MatchStartTimestamp.gte(range_start))
        .filter(global_game::Column::MatchStartTimestamp.lte(range_end));

    select = match meta.hearthstone_build {
        Some(build) => select.filter(global_game::Column::HearthstoneBuild.eq(build)),
        None => select.filter(global_game::Column::HearthstoneBuild.is_null()),
    };
    select = match meta.game_id {
        Some(game_id) => select.filter(global_game::Column::GameServerGameId.eq(game_id)),
        None => select.filter(global_game::Column::GameServerGameId.is_null()),
    };
    select = match meta.server_ip.as_deref() {
        Some(address) => select.filter(global_game::Column::GameServerAddress.eq(address)),
        None => select.filter(global_game::Column::GameServerAddress.is_null()),
    };
    select = match meta.server_port {
        Some(port) => select.filter(global_game::Column::GameServerPort.eq(port)),
        None => select.filter(global_game::Column::GameServerPort.is_null()),
    };

    let matches = select.all(db).await?;

    if matches.len() > 1 {
        return Err(ProcessingError::server(format!(
            "Found {} global games for one deduplication tuple; refusing to pick one",
            matches.len()
        )));
    }

    let Some(game) = matches.into_iter().next() else {
        let game = create_global_game(db, meta, tree).await?;
        return Ok(GameResolution::Created(game));
    };

    // Check for a duplicate upload of the same game from this exact
    // point of view.
    let povs = game_replay::Entity::find()
        .filter(game_replay::Column::GlobalGameId.eq(game.id))
        .filter(game_replay::Column::IsSpectatedGame.eq(meta.spectator_mode))
        .filter(game_replay::Column::GameServerClientId.eq(meta.client_id))
        .all(db)
        .await?;

    if povs.len() > 1 {
        return Err(ProcessingError::server(format!(
            "Found {} replays of game {} from one vantage point",
            povs.len(),
            game.id
        )));
    }

    if let Some(replay) = povs.into_iter().next() {
        info!(
            global_game_id = game.id,
            replay_id = replay.id,
            "Upload already processed from this vantage point"
        );
        return Ok(GameResolution::AlreadyProcessed { game, replay });
    }

    debug!(global_game_id = game.id, "Unified upload into existing global game");
    Ok(GameResolution::Unified(game))
}

async fn create_global_game<C: ConnectionTrait>(
    db: &C,
    meta: &UploadMeta,
    tree: &GameTree,
) -> Result<global_game::Model, ProcessingError> {
    let ladder_season = meta
        .ladder_season
        .unwrap_or_else(|| guess_ladder_season(tree.end_time));

    let game = global_game::ActiveModel {
        game_server_game_id: Set(meta.game_id),
        game_server_address: Set(meta.server_ip.clone()),
        game_server_port: Set(meta.server_port),
        hearthstone_build: Set(meta.hearthstone_build),
        game_type: Set(meta.game_type.unwrap_or_default()),
        match_start_timestamp: Set(tree.start_time),
        match_end_timestamp: Set(tree.end_time),
        ladder_season: Set(Some(ladder_season)),
        brawl_season: Set(0),
        scenario_id: Set(meta.scenario_id),
        num_turns: Set(tree.num_turns),
        num_entities: Set(tree.num_entities()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(global_game_id = game.id, "Created global game");
    Ok(game)
}
