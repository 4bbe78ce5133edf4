use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::upload_status::UploadEventType;

/// Blob key for a raw uploaded log.
///
/// `uploads/YYYY/MM/DD/<token>/<shortid><extension>`, with a fixed
/// placeholder segment for anonymous uploads.
pub fn upload_log_key(
    created: DateTime<Utc>,
    token: Option<&str>,
    shortid: &Uuid,
    upload_type: UploadEventType,
) -> String {
    format!(
        "uploads/{}/{}/{}{}",
        created.format("%Y/%m/%d"),
        token.unwrap_or("unknown-token"),
        shortid,
        upload_type.extension(),
    )
}

/// Blob key for a generated replay document, namespaced by the match
/// start date rather than the upload date.
pub fn replay_document_key(match_start: DateTime<Utc>, shortid: &Uuid) -> String {
    format!("{}/replays/{}.json", match_start.format("%Y/%m/%d"), shortid)
}
