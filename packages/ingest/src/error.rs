use common::UploadEventStatus;
use common::game_tree::ParseError;
use common::meta::MetaError;
use common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

/// Failure classes of the upload-processing pipeline.
///
/// Everything below the queue-consumer boundary returns this enum; the
/// consumer is the single place that translates a variant into a
/// terminal upload status and surfaced error text.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The log could not be tokenized at all.
    #[error("parsing error: {0}")]
    Parsing(String),

    /// The log parsed but yielded data the pipeline cannot use, e.g. a
    /// player with no resolvable name or an undeterminable friendly
    /// side.
    #[error("unsupported replay: {0}")]
    Unsupported(String),

    /// Structurally well-formed input that is semantically invalid,
    /// e.g. a log carrying more than one game.
    #[error("validation error: {0}")]
    Validation(String),

    /// Anything unexpected: storage failures, colliding global games,
    /// broken invariants. Needs operator triage.
    #[error("server error: {0}")]
    Server(String),
}

impl ProcessingError {
    pub fn parsing(msg: impl Into<String>) -> Self {
        Self::Parsing(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// The terminal upload status this failure maps to. Applied exactly
    /// once, at the consumer boundary.
    pub fn terminal_status(&self) -> UploadEventStatus {
        match self {
            Self::Parsing(_) | Self::Validation(_) => UploadEventStatus::ParsingError,
            Self::Unsupported(_) => UploadEventStatus::Unsupported,
            Self::Server(_) => UploadEventStatus::ServerError,
        }
    }
}

impl From<DbErr> for ProcessingError {
    fn from(err: DbErr) -> Self {
        Self::Server(err.to_string())
    }
}

impl From<StorageError> for ProcessingError {
    fn from(err: StorageError) -> Self {
        Self::Server(err.to_string())
    }
}

impl From<ParseError> for ProcessingError {
    fn from(err: ParseError) -> Self {
        Self::Parsing(err.message)
    }
}

impl From<MetaError> for ProcessingError {
    fn from(err: MetaError) -> Self {
        Self::Validation(err.to_string())
    }
}
