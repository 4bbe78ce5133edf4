#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of an upload event during the processing lifecycle.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum UploadEventStatus {
    /// Just created, not yet picked up by a consumer.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Unknown"))]
    Unknown,
    /// A consumer is running the parse/dedup/build pipeline.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Processing"))]
    Processing,
    /// Replay built and linked.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Success"))]
    Success,
    /// The log could not be parsed into a usable game.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ParsingError"))]
    ParsingError,
    /// The log parsed but describes a game the pipeline cannot use.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Unsupported"))]
    Unsupported,
    /// An unexpected failure; needs operator triage.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ServerError"))]
    ServerError,
}

impl UploadEventStatus {
    /// Returns true once processing has reached a final outcome.
    /// Terminal records are never reprocessed automatically; requeueing
    /// them is an explicit operator action.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Processing)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// All possible status values.
    pub const ALL: &'static [UploadEventStatus] = &[
        Self::Unknown,
        Self::Processing,
        Self::Success,
        Self::ParsingError,
        Self::Unsupported,
        Self::ServerError,
    ];

    /// All terminal statuses.
    pub const TERMINAL: &'static [UploadEventStatus] = &[
        Self::Success,
        Self::ParsingError,
        Self::Unsupported,
        Self::ServerError,
    ];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Processing => "Processing",
            Self::Success => "Success",
            Self::ParsingError => "ParsingError",
            Self::Unsupported => "Unsupported",
            Self::ServerError => "ServerError",
        }
    }
}

impl fmt::Display for UploadEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for UploadEventStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            UploadEventStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for UploadEventStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unknown" => Ok(Self::Unknown),
            "Processing" => Ok(Self::Processing),
            "Success" => Ok(Self::Success),
            "ParsingError" => Ok(Self::ParsingError),
            "Unsupported" => Ok(Self::Unsupported),
            "ServerError" => Ok(Self::ServerError),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Kind of log file an uploader submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum UploadEventType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PowerLog"))]
    PowerLog,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "OutputTxt"))]
    OutputTxt,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "HsreplayXml"))]
    HsreplayXml,
}

impl UploadEventType {
    /// File extension used in raw-log blob keys.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::PowerLog => ".power.log",
            Self::OutputTxt => ".output.txt",
            Self::HsreplayXml => ".hsreplay.xml",
        }
    }
}

impl Default for UploadEventType {
    fn default() -> Self {
        Self::PowerLog
    }
}
