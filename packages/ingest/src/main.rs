use std::sync::Arc;

use anyhow::Context;
use common::game_tree::JsonLogParser;
use common::storage::filesystem::FilesystemBlobStore;
use mq::{MqConfig, init_mq};
use tracing::info;

use ingest::config::AppConfig;
use ingest::state::AppState;
use ingest::{consumers, database, seed, stuck};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;

    let storage = Arc::new(
        FilesystemBlobStore::new(
            config.storage.root.clone().into(),
            config.storage.max_upload_size,
        )
        .await
        .context("Failed to initialize blob store")?,
    );

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?,
    );

    info!(queue_name = %config.mq.queue_name, "MQ connected");

    let state = AppState {
        db: db.clone(),
        mq: Some(Arc::clone(&mq)),
        storage,
        parser: Arc::new(JsonLogParser),
        config: config.clone(),
    };

    tokio::spawn(stuck::run_stuck_upload_detector(
        db,
        config.processing.clone(),
    ));

    let queue_name = config.mq.queue_name.clone();
    consumers::consume_upload_events(state, mq, queue_name).await;

    Ok(())
}
