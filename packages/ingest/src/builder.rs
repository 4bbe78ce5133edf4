use chrono::Utc;
use common::PlayState;
use common::deck::{canonical_card_list, deck_digest};
use common::game_tree::{GameTree, ParsedPlayer};
use common::meta::UploadMeta;
use common::storage::{BlobStore, replay_document_key};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dedup::GameResolution;
use crate::document::{REPLAY_DOCUMENT_VERSION, ReplayDocument};
use crate::entity::{auth_token, deck, game_replay, global_game, global_game_player};
use crate::error::ProcessingError;
use crate::events;

/// Determine which slot the upload represents. An explicit client
/// declaration wins; otherwise the hidden-hand heuristic on the parsed
/// tree decides. Never defaulted: an undeterminable side is a hard
/// failure.
pub fn friendly_player_id(meta: &UploadMeta, tree: &GameTree) -> Result<i16, ProcessingError> {
    meta.friendly_player
        .or_else(|| tree.guess_friendly_player())
        .ok_or_else(|| {
            ProcessingError::unsupported(
                "Friendly player ID not present at upload and could not guess it",
            )
        })
}

/// Resolve a card list to its canonical deck row, creating it on first
/// sighting. Idempotent: permutations of the same multiset share one
/// digest, and an insert race resolves to whichever row won.
pub async fn resolve_deck<C: ConnectionTrait>(
    db: &C,
    card_ids: &[String],
) -> Result<deck::Model, ProcessingError> {
    let digest = deck_digest(card_ids);

    if let Some(existing) = deck::Entity::find()
        .filter(deck::Column::Digest.eq(&digest))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let model = deck::ActiveModel {
        digest: Set(digest.clone()),
        card_ids: Set(serde_json::json!(canonical_card_list(card_ids))),
        created: Set(Utc::now()),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(inserted) => Ok(inserted),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            deck::Entity::find()
                .filter(deck::Column::Digest.eq(&digest))
                .one(db)
                .await?
                .ok_or_else(|| {
                    ProcessingError::server("Deck digest conflict but existing row not found")
                })
        }
        Err(e) => Err(e.into()),
    }
}

/// The card list used for a player's deck row: the client-declared
/// full list when present, otherwise whatever the parser observed
/// entering the starting deck zone.
fn deck_card_list(meta: &UploadMeta, player: &ParsedPlayer) -> Vec<String> {
    if let Some(declared) = &meta.player(player.player_id).deck {
        declared.clone()
    } else {
        player.initial_deck_card_ids.clone()
    }
}

/// The outcome of the friendly player, as stored on the replay row.
/// A log that ends mid-game marks the replay disconnected with no
/// win/loss; ties count as a loss for the uploader's book-keeping.
pub fn derive_outcome(final_state: PlayState) -> (Option<bool>, bool) {
    if final_state.is_abnormal() {
        (None, true)
    } else {
        (Some(final_state.is_won()), false)
    }
}

async fn create_game_players<C: ConnectionTrait>(
    db: &C,
    meta: &UploadMeta,
    tree: &GameTree,
    game: &global_game::Model,
) -> Result<(), ProcessingError> {
    for player in &tree.players {
        let name = player.name.clone().ok_or_else(|| {
            ProcessingError::unsupported(format!(
                "Player {} has no resolvable name",
                player.player_id
            ))
        })?;
        let hero_card_id = player.hero_card_id.clone().ok_or_else(|| {
            ProcessingError::unsupported(format!("Player {} has no hero", player.player_id))
        })?;

        let declared = meta.player(player.player_id);
        let deck_row = resolve_deck(db, &deck_card_list(meta, player)).await?;

        global_game_player::ActiveModel {
            game_id: Set(game.id),
            player_id: Set(player.player_id),
            name: Set(name),
            real_name: Set(declared.name.clone()),
            account_hi: Set(player.account_hi),
            account_lo: Set(player.account_lo),
            is_ai: Set(player.is_ai),
            is_first: Set(player.is_first),
            rank: Set(declared.rank),
            legend_rank: Set(declared.legend_rank),
            stars: Set(declared.stars),
            wins: Set(declared.wins),
            losses: Set(declared.losses),
            hero_card_id: Set(hero_card_id),
            hero_premium: Set(player.hero_premium),
            final_state: Set(player.final_state),
            deck_id: Set(deck_row.id),
            duplicated: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Assemble and persist the replay for one upload's point of view.
///
/// Expects a resolution from the deduplication engine; the
/// `AlreadyProcessed` short-circuit must be handled by the caller
/// before getting here.
pub async fn build_replay<C: ConnectionTrait>(
    db: &C,
    storage: &dyn BlobStore,
    meta: &UploadMeta,
    tree: &GameTree,
    token: Option<&auth_token::Model>,
    resolution: &GameResolution,
) -> Result<game_replay::Model, ProcessingError> {
    let friendly = friendly_player_id(meta, tree)?;

    if tree.players.len() != 2 {
        return Err(ProcessingError::validation(format!(
            "Expected exactly 2 players, got {}",
            tree.players.len()
        )));
    }

    let game = match resolution {
        GameResolution::Created(game) => {
            create_game_players(db, meta, tree, game).await?;
            game
        }
        GameResolution::Unified(game) => {
            // Late-arriving uploads could enrich the existing player
            // rows with fields only this vantage point knows (real
            // names, a fuller deck list). Left unimplemented until the
            // intended merge semantics are decided.
            debug!(global_game_id = game.id, "Skipping player rows of unified game");
            game
        }
        GameResolution::AlreadyProcessed { replay, .. } => {
            return Err(ProcessingError::server(format!(
                "build_replay called for already-processed replay {}",
                replay.id
            )));
        }
    };

    // Guard against a second replay for the same (credential, game)
    // pair before doing any blob work.
    if let Some(token) = token
        && let Some(existing) = find_existing_replay(db, &token.key, game.id).await?
    {
        return Ok(existing);
    }

    let friendly_state = tree
        .player(friendly)
        .map(|p| p.final_state)
        .ok_or_else(|| {
            ProcessingError::unsupported(format!("Friendly player {friendly} not in game tree"))
        })?;
    let (won, disconnected) = derive_outcome(friendly_state);

    let shortid = Uuid::new_v4();
    let document = ReplayDocument::build(tree, meta, friendly);
    let document_bytes = document
        .to_bytes()
        .map_err(|e| ProcessingError::server(e.to_string()))?;
    let document_key = replay_document_key(game.match_start_timestamp, &shortid);

    storage.put(&document_key, &document_bytes).await?;
    events::replay_document_size(&shortid, document_bytes.len());

    let user_id = token.and_then(|t| t.user_id);

    let model = game_replay::ActiveModel {
        shortid: Set(shortid),
        upload_token_id: Set(token.map(|t| t.key.clone())),
        user_id: Set(user_id),
        global_game_id: Set(game.id),
        is_spectated_game: Set(meta.spectator_mode),
        friendly_player_id: Set(friendly),
        game_server_client_id: Set(meta.client_id),
        game_server_spectate_key: Set(meta.spectate_key.clone()),
        replay_document_key: Set(Some(document_key.clone())),
        document_version: Set(REPLAY_DOCUMENT_VERSION.to_string()),
        is_deleted: Set(false),
        exclude_in_aggregate_stats: Set(false),
        won: Set(won),
        disconnected: Set(disconnected),
        ..Default::default()
    };

    let replay = match model.insert(db).await {
        Ok(inserted) => inserted,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            // A concurrent worker processed the same credential/game
            // pair first; theirs is the replay. Our orphaned document
            // blob is removed, not leaked.
            let _ = storage.delete(&document_key).await;
            let token_key = token.map(|t| t.key.as_str()).ok_or_else(|| {
                ProcessingError::server("Replay unique conflict without a credential")
            })?;
            find_existing_replay(db, token_key, game.id)
                .await?
                .ok_or_else(|| {
                    ProcessingError::server("Replay unique conflict but existing row not found")
                })?
        }
        Err(e) => return Err(e.into()),
    };

    // Defer attribution until the credential gains a real user.
    if let Some(token) = token
        && user_id.is_none()
    {
        create_pending_claim(db, &replay, &token.key).await?;
    }

    info!(
        replay_id = replay.id,
        shortid = %replay.shortid,
        global_game_id = game.id,
        friendly_player = friendly,
        "Built game replay"
    );

    Ok(replay)
}

async fn find_existing_replay<C: ConnectionTrait>(
    db: &C,
    token_key: &str,
    global_game_id: i64,
) -> Result<Option<game_replay::Model>, ProcessingError> {
    Ok(game_replay::Entity::find()
        .filter(game_replay::Column::UploadTokenId.eq(token_key))
        .filter(game_replay::Column::GlobalGameId.eq(global_game_id))
        .one(db)
        .await?)
}

async fn create_pending_claim<C: ConnectionTrait>(
    db: &C,
    replay: &game_replay::Model,
    token_key: &str,
) -> Result<(), ProcessingError> {
    use crate::entity::pending_replay_claim;

    let model = pending_replay_claim::ActiveModel {
        replay_id: Set(replay.id),
        token_id: Set(token_key.to_string()),
        created: Set(Utc::now()),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(_) => Ok(()),
        // A redelivered message already created the claim.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
