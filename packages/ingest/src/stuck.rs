use std::time::Duration;

use chrono::Utc;
use common::UploadEventStatus;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{error, info};

use crate::config::ProcessingConfig;
use crate::entity::upload_event;
use crate::events;

/// Run the stuck upload detector as a background task.
///
/// A worker that dies mid-pipeline leaves its record in Processing
/// forever; nothing times the pipeline out. This scan gives those
/// records a terminal ServerError so operators see them and can
/// requeue.
pub async fn run_stuck_upload_detector(db: DatabaseConnection, config: ProcessingConfig) {
    let scan_interval = Duration::from_secs(config.stuck_scan_interval_secs);

    info!(
        timeout_secs = config.stuck_timeout_secs,
        scan_interval_secs = config.stuck_scan_interval_secs,
        "Starting stuck upload detector"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        if let Err(e) = detect_and_fail_stuck_uploads(&db, &config).await {
            error!(error = %e, "Stuck upload detection failed");
        }
    }
}

/// Scan for records stuck in Processing past the timeout and fail them.
/// Returns how many records were transitioned.
pub async fn detect_and_fail_stuck_uploads(
    db: &DatabaseConnection,
    config: &ProcessingConfig,
) -> anyhow::Result<u64> {
    let timeout_threshold =
        Utc::now() - chrono::Duration::seconds(config.stuck_timeout_secs as i64);

    let stuck = upload_event::Entity::find()
        .filter(upload_event::Column::Status.eq(UploadEventStatus::Processing))
        .filter(upload_event::Column::ProcessingStartedAt.lt(timeout_threshold))
        .all(db)
        .await?;

    if stuck.is_empty() {
        return Ok(0);
    }

    info!(count = stuck.len(), "Found stuck upload events");

    let mut failed = 0u64;
    for record in stuck {
        let upload_event_id = record.id;
        let age = record
            .processing_started_at
            .map(|t| (Utc::now() - t).to_std().unwrap_or_default())
            .unwrap_or_default();

        let mut active: upload_event::ActiveModel = record.into();
        active.status = Set(UploadEventStatus::ServerError);
        active.error_message = Set(Some(format!(
            "Stuck in Processing for over {} seconds; worker presumed dead",
            config.stuck_timeout_secs
        )));
        active.update(db).await?;

        events::processing_outcome(upload_event_id, UploadEventStatus::ServerError, age);
        info!(upload_event_id, "Failed stuck upload event");
        failed += 1;
    }

    Ok(failed)
}
