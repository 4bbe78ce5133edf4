use common::{UploadEventStatus, UploadEventType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One ingestion attempt: the raw log as uploaded, the client-declared
/// metadata, and the processing lifecycle around them.
///
/// Records are only ever mutated by the queue consumer (and the stuck
/// detector). They are never deleted automatically; deleting one is an
/// operator action that also removes the raw log blob.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Public identifier used in URLs and operator tooling.
    #[sea_orm(unique)]
    pub shortid: Uuid,

    /// Upload credential; NULL for anonymous uploads.
    pub token_id: Option<String>,
    #[sea_orm(belongs_to, from = "token_id", to = "key")]
    pub token: Option<super::auth_token::Entity>,

    pub upload_type: UploadEventType,

    /// Back-reference to the replay a successful run produced.
    pub game_id: Option<i64>,
    #[sea_orm(belongs_to, from = "game_id", to = "id")]
    pub game: Option<super::game_replay::Entity>,

    pub created: DateTimeUtc,

    pub upload_ip: String,

    #[sea_orm(indexed)]
    pub status: UploadEventStatus,

    /// Operator marker for suspect uploads; no pipeline effect.
    #[sea_orm(default_value = false)]
    pub tainted: bool,

    /// Set when a consumer takes the record. The age of a record stuck
    /// in Processing is measured from here.
    pub processing_started_at: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Text")]
    pub error_message: Option<String>,

    /// Debug-format error chain captured for operator triage.
    #[sea_orm(column_type = "Text")]
    pub error_details: Option<String>,

    /// Client-declared metadata, stored verbatim as accepted.
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: serde_json::Value,

    /// Blob key of the raw uploaded log.
    pub file_key: String,
}

impl ActiveModelBehavior for ActiveModel {}
