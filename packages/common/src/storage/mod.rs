mod error;
mod keys;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use keys::{replay_document_key, upload_log_key};
pub use traits::BlobStore;
