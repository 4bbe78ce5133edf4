pub mod upload_event;

pub use upload_event::{consume_upload_events, handle_upload_event};
