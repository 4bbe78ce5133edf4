pub mod deck;
pub mod game;
pub mod game_tree;
pub mod meta;
pub mod storage;
pub mod upload_job;
pub mod upload_status;

pub use game::{BnetGameType, PlayState};
pub use upload_status::{UploadEventStatus, UploadEventType};
