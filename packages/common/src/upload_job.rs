use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue message asking a consumer to process one upload event.
///
/// Delivery is at-least-once: the same job id may arrive more than
/// once, so the processing pipeline has to be idempotent per upload
/// event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessUploadEvent {
    /// Message identifier (UUID), distinct per enqueue.
    pub job_id: String,
    /// Database id of the upload event to process.
    pub upload_event_id: i64,
}

impl ProcessUploadEvent {
    pub fn new(upload_event_id: i64) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            upload_event_id,
        }
    }
}
