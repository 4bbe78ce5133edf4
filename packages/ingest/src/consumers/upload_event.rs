use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use common::UploadEventStatus;
use common::meta::UploadMeta;
use common::upload_job::ProcessUploadEvent;
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::{error, info};

use crate::builder;
use crate::dedup::{self, GameResolution};
use crate::entity::{auth_token, game_replay, upload_event};
use crate::error::ProcessingError;
use crate::events;
use crate::state::AppState;

/// Consume upload-processing messages from the queue.
///
/// Delivery is at-least-once; `handle_upload_event` is safe to run
/// twice for the same record.
pub async fn consume_upload_events(state: AppState, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting upload event consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded for sequential DB writes
            None,
            move |message: BrokerMessage<ProcessUploadEvent>| {
                let state = state.clone();
                async move {
                    let job = message.payload;

                    if let Err(e) = handle_upload_event(&state, job.upload_event_id).await {
                        error!(
                            upload_event_id = job.upload_event_id,
                            job_id = %job.job_id,
                            error = %e,
                            "Failed to process upload event"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Upload event consumer stopped unexpectedly");
    }
}

/// Drive one upload record through the pipeline and leave it in a
/// terminal state.
///
/// This is the only place that maps pipeline failures to statuses and
/// surfaced error text. The returned error is reserved for conditions
/// the record itself cannot absorb: a message referencing a record
/// that does not exist (a producer bug, never swallowed) or a failure
/// to persist the status itself.
pub async fn handle_upload_event(state: &AppState, upload_event_id: i64) -> anyhow::Result<()> {
    let Some(record) = upload_event::Entity::find_by_id(upload_event_id)
        .one(&state.db)
        .await?
    else {
        anyhow::bail!("Upload event {upload_event_id} does not exist");
    };

    if let Some(game_id) = record.game_id {
        // Redelivered or requeued after success: the replay already
        // exists, nothing to rebuild.
        info!(
            upload_event_id,
            game_id, "Upload event already has a replay, skipping"
        );
        return Ok(());
    }

    let started = Instant::now();

    // Persisted before any parsing work, so a crash mid-processing is
    // visible as a record stuck in Processing rather than silently lost.
    let mut active: upload_event::ActiveModel = record.clone().into();
    active.status = Set(UploadEventStatus::Processing);
    active.processing_started_at = Set(Some(Utc::now()));
    let record = active.update(&state.db).await?;

    match run_pipeline(state, &record).await {
        Ok(replay) => {
            let mut active: upload_event::ActiveModel = record.into();
            active.game_id = Set(Some(replay.id));
            active.status = Set(UploadEventStatus::Success);
            active.error_message = Set(None);
            active.error_details = Set(None);
            active.update(&state.db).await?;

            events::processing_outcome(
                upload_event_id,
                UploadEventStatus::Success,
                started.elapsed(),
            );
            info!(
                upload_event_id,
                replay_id = replay.id,
                replay_shortid = %replay.shortid,
                "Processed upload event"
            );
        }
        Err(e) => {
            let status = e.terminal_status();
            let mut active: upload_event::ActiveModel = record.into();
            active.status = Set(status);
            active.error_message = Set(Some(e.to_string()));
            active.error_details = Set(Some(format!("{e:?}")));
            active.update(&state.db).await?;

            events::processing_outcome(upload_event_id, status, started.elapsed());
            info!(
                upload_event_id,
                status = %status,
                error = %e,
                "Upload event processing failed"
            );
        }
    }

    Ok(())
}

async fn run_pipeline(
    state: &AppState,
    record: &upload_event::Model,
) -> Result<game_replay::Model, ProcessingError> {
    let meta: UploadMeta = serde_json::from_value(record.metadata.clone())
        .map_err(|e| ProcessingError::validation(format!("Malformed upload metadata: {e}")))?;
    meta.validate()?;

    let token = match &record.token_id {
        Some(key) => auth_token::Entity::find_by_id(key.as_str()).one(&state.db).await?,
        None => None,
    };

    let raw = state.storage.get(&record.file_key).await?;
    let parsed = state.parser.parse(&raw, meta.match_start_timestamp)?;

    if parsed.games.len() != 1 {
        return Err(ProcessingError::validation(format!(
            "Expected exactly 1 game, got {}",
            parsed.games.len()
        )));
    }
    let tree = &parsed.games[0];

    let window = Duration::hours(state.config.processing.dedup_window_hours);
    let resolution = dedup::resolve_global_game(&state.db, &meta, tree, window).await?;

    // Same game, same vantage point: this exact upload was already
    // processed. Hand back the existing replay instead of building a
    // second one.
    if let GameResolution::AlreadyProcessed { replay, .. } = resolution {
        return Ok(replay);
    }

    builder::build_replay(
        &state.db,
        state.storage.as_ref(),
        &meta,
        tree,
        token.as_ref(),
        &resolution,
    )
    .await
}
