use std::sync::Arc;

use common::game_tree::LogParser;
use common::storage::BlobStore;
use mq::Mq;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

/// Injected collaborators the pipeline runs against. Constructed once
/// at startup; tests substitute in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub mq: Option<Arc<Mq>>,
    pub storage: Arc<dyn BlobStore>,
    pub parser: Arc<dyn LogParser>,
    pub config: AppConfig,
}
