use std::time::Duration;

use common::UploadEventStatus;
use tracing::info;

/// Target all observability events are emitted under, so a metrics
/// forwarder can subscribe to exactly this stream.
pub const EVENT_TARGET: &str = "hearthvault::events";

/// Emitted exactly once per terminal transition of an upload record.
pub fn processing_outcome(upload_event_id: i64, status: UploadEventStatus, duration: Duration) {
    info!(
        target: EVENT_TARGET,
        event = "upload_processing_outcome",
        upload_event_id,
        status = %status,
        success = status.is_success(),
        duration_ms = duration.as_millis() as u64,
        "Upload processing finished"
    );
}

/// Size of a generated replay document, recorded when it is persisted.
pub fn replay_document_size(replay_shortid: &uuid::Uuid, num_bytes: usize) {
    info!(
        target: EVENT_TARGET,
        event = "replay_document_num_bytes",
        shortid = %replay_shortid,
        num_bytes,
        "Replay document written"
    );
}

/// Emitted for every attempt to enqueue an upload for processing.
pub fn upload_enqueued(upload_event_id: i64, success: bool) {
    info!(
        target: EVENT_TARGET,
        event = "queue_upload_event_for_processing",
        upload_event_id,
        success,
        "Upload enqueued for processing"
    );
}
