use chrono::Utc;
use common::meta::{MetaError, UploadMeta};
use common::storage::{StorageError, upload_log_key};
use common::upload_job::ProcessUploadEvent;
use common::{UploadEventStatus, UploadEventType};
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entity::{game_replay, global_game, global_game_player, pending_replay_claim, upload_event};
use crate::events;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid upload metadata: {0}")]
    Validation(#[from] MetaError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error("upload event {0} not found")]
    NotFound(Uuid),
}

/// A new upload as accepted at the ingress boundary.
pub struct NewUploadEvent {
    pub token_key: Option<String>,
    pub upload_type: UploadEventType,
    pub upload_ip: String,
    pub meta: UploadMeta,
    pub raw_log: Vec<u8>,
}

/// Accept an upload: validate the declared metadata, persist the raw
/// log blob and the Unknown-status record, then enqueue a processing
/// message. Fast and synchronous; all parsing happens out-of-band.
pub async fn create_upload_event(
    state: &AppState,
    new: NewUploadEvent,
) -> Result<upload_event::Model, UploadError> {
    new.meta.validate()?;

    let shortid = Uuid::new_v4();
    let created = Utc::now();
    let file_key = upload_log_key(created, new.token_key.as_deref(), &shortid, new.upload_type);

    state.storage.put(&file_key, &new.raw_log).await?;

    let metadata = serde_json::to_value(&new.meta)
        .map_err(|e| DbErr::Custom(format!("Failed to serialize upload metadata: {e}")))?;

    let model = upload_event::ActiveModel {
        shortid: Set(shortid),
        token_id: Set(new.token_key),
        upload_type: Set(new.upload_type),
        game_id: Set(None),
        created: Set(created),
        upload_ip: Set(new.upload_ip),
        status: Set(UploadEventStatus::Unknown),
        tainted: Set(false),
        processing_started_at: Set(None),
        error_message: Set(None),
        error_details: Set(None),
        metadata: Set(metadata),
        file_key: Set(file_key),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    enqueue_upload_event(state, &model).await;

    info!(
        upload_event_id = model.id,
        shortid = %model.shortid,
        "Accepted upload event"
    );

    Ok(model)
}

/// Publish the processing message for an upload event. Failures are
/// surfaced as events and logs, not errors: the record exists either
/// way and can be requeued.
async fn enqueue_upload_event(state: &AppState, record: &upload_event::Model) {
    let Some(ref mq) = state.mq else {
        tracing::debug!("MQ unavailable, skipping enqueue");
        return;
    };

    let job = ProcessUploadEvent::new(record.id);
    let job_id = job.job_id.clone();

    match mq
        .publish(&state.config.mq.queue_name, None, &job, None)
        .await
    {
        Ok(_) => {
            events::upload_enqueued(record.id, true);
            info!(
                upload_event_id = record.id,
                job_id = %job_id,
                "Upload event enqueued"
            );
        }
        Err(e) => {
            events::upload_enqueued(record.id, false);
            warn!(error = %e, upload_event_id = record.id, "Failed to enqueue upload event");
        }
    }
}

/// Fetch an upload event and the replay it produced, if any.
pub async fn get_upload_outcome(
    state: &AppState,
    id: i64,
) -> Result<(upload_event::Model, Option<game_replay::Model>), UploadError> {
    let record = upload_event::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("upload event {id}")))?;

    let replay = match record.game_id {
        Some(game_id) => game_replay::Entity::find_by_id(game_id).one(&state.db).await?,
        None => None,
    };

    Ok((record, replay))
}

/// Explicit operator action: requeue a terminal record for another
/// processing run. The consumer re-enters the record at Processing;
/// records with a linked replay short-circuit to it.
pub async fn requeue_upload_event(state: &AppState, shortid: Uuid) -> Result<(), UploadError> {
    let record = upload_event::Entity::find()
        .filter(upload_event::Column::Shortid.eq(shortid))
        .one(&state.db)
        .await?
        .ok_or(UploadError::NotFound(shortid))?;

    info!(
        upload_event_id = record.id,
        status = %record.status,
        "Requeueing upload event"
    );
    enqueue_upload_event(state, &record).await;
    Ok(())
}

/// Operator deletion of an upload record. The raw log blob goes with
/// it; the blob store does not cascade on its own.
pub async fn delete_upload_event(state: &AppState, shortid: Uuid) -> Result<(), UploadError> {
    let record = upload_event::Entity::find()
        .filter(upload_event::Column::Shortid.eq(shortid))
        .one(&state.db)
        .await?
        .ok_or(UploadError::NotFound(shortid))?;

    state.storage.delete(&record.file_key).await?;
    upload_event::Entity::delete_by_id(record.id)
        .exec(&state.db)
        .await?;

    info!(upload_event_id = record.id, shortid = %shortid, "Deleted upload event");
    Ok(())
}

/// Delete a replay, its document blob, and its pending claims. When
/// the last replay of a global game goes away, the game and its player
/// rows are deleted too — that cascade is this caller's job, nothing
/// in the schema does it automatically.
pub async fn delete_replay(state: &AppState, shortid: Uuid) -> Result<(), UploadError> {
    let replay = game_replay::Entity::find()
        .filter(game_replay::Column::Shortid.eq(shortid))
        .one(&state.db)
        .await?
        .ok_or(UploadError::NotFound(shortid))?;

    if let Some(ref key) = replay.replay_document_key {
        state.storage.delete(key).await?;
    }

    pending_replay_claim::Entity::delete_many()
        .filter(pending_replay_claim::Column::ReplayId.eq(replay.id))
        .exec(&state.db)
        .await?;

    // Upload records outlive their replay; unlink them rather than
    // deleting audit history.
    upload_event::Entity::update_many()
        .col_expr(
            upload_event::Column::GameId,
            sea_orm::sea_query::Expr::value(Option::<i64>::None),
        )
        .filter(upload_event::Column::GameId.eq(replay.id))
        .exec(&state.db)
        .await?;

    game_replay::Entity::delete_by_id(replay.id)
        .exec(&state.db)
        .await?;

    let remaining = game_replay::Entity::find()
        .filter(game_replay::Column::GlobalGameId.eq(replay.global_game_id))
        .one(&state.db)
        .await?;

    if remaining.is_none() {
        global_game_player::Entity::delete_many()
            .filter(global_game_player::Column::GameId.eq(replay.global_game_id))
            .exec(&state.db)
            .await?;
        global_game::Entity::delete_by_id(replay.global_game_id)
            .exec(&state.db)
            .await?;
        info!(
            global_game_id = replay.global_game_id,
            "Deleted global game with its last replay"
        );
    }

    info!(replay_id = replay.id, shortid = %shortid, "Deleted game replay");
    Ok(())
}
