use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use common::UploadEventType;
use common::game_tree::JsonLogParser;
use common::meta::UploadMeta;
use common::storage::filesystem::FilesystemBlobStore;
use mq::{MqConfig, init_mq};

use ingest::config::AppConfig;
use ingest::consumers::handle_upload_event;
use ingest::state::AppState;
use ingest::uploads::{
    NewUploadEvent, create_upload_event, delete_upload_event, get_upload_outcome,
    requeue_upload_event,
};
use ingest::{claims, database, seed, stuck};

#[derive(Parser, Debug)]
#[command(name = "hearthvault", about = "Operator tooling for the replay ingestion core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a log file locally, bypassing the queue.
    Ingest {
        /// Path to the raw log file.
        log: PathBuf,
        /// Path to a JSON file with the client-declared metadata.
        #[arg(long)]
        meta: PathBuf,
        /// Upload credential to attribute the replay to.
        #[arg(long)]
        token: Option<String>,
    },
    /// Requeue a terminal upload event for another processing run.
    Requeue {
        /// Short id of the upload event.
        shortid: Uuid,
    },
    /// Delete an upload event and its raw log blob.
    DeleteUpload {
        /// Short id of the upload event.
        shortid: Uuid,
    },
    /// Transfer leftover pending claims for credentials that already
    /// have users.
    SweepClaims,
    /// Run one stuck-record scan and fail anything past the timeout.
    StuckScan,
}

async fn build_state(config: AppConfig, with_mq: bool) -> anyhow::Result<AppState> {
    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db).await?;

    let storage = Arc::new(
        FilesystemBlobStore::new(
            config.storage.root.clone().into(),
            config.storage.max_upload_size,
        )
        .await
        .context("Failed to initialize blob store")?,
    );

    let mq = if with_mq && config.mq.enabled {
        Some(Arc::new(
            init_mq(MqConfig {
                url: config.mq.url.clone(),
                pool_size: config.mq.pool_size,
            })
            .await
            .context("Failed to initialize MQ")?,
        ))
    } else {
        None
    };

    Ok(AppState {
        db,
        mq,
        storage,
        parser: Arc::new(JsonLogParser),
        config,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load config")?;

    match cli.command {
        Commands::Ingest { log, meta, token } => {
            let raw_log = std::fs::read(&log)
                .with_context(|| format!("Failed to read log file {}", log.display()))?;
            let meta_bytes = std::fs::read(&meta)
                .with_context(|| format!("Failed to read metadata file {}", meta.display()))?;
            let meta: UploadMeta =
                serde_json::from_slice(&meta_bytes).context("Failed to parse metadata JSON")?;

            let state = build_state(config, false).await?;
            if let Some(ref key) = token {
                ingest::identity::get_or_create_token(&state.db, key).await?;
            }

            let record = create_upload_event(
                &state,
                NewUploadEvent {
                    token_key: token,
                    upload_type: UploadEventType::PowerLog,
                    upload_ip: "127.0.0.1".into(),
                    meta,
                    raw_log,
                },
            )
            .await?;
            handle_upload_event(&state, record.id).await?;

            let (record, replay) = get_upload_outcome(&state, record.id).await?;
            println!("upload {} finished: {}", record.shortid, record.status);
            if let Some(replay) = replay {
                println!("replay {}", replay.shortid);
            } else if let Some(message) = record.error_message {
                println!("error: {message}");
            }
        }
        Commands::Requeue { shortid } => {
            let state = build_state(config, true).await?;
            requeue_upload_event(&state, shortid).await?;
            println!("requeued {shortid}");
        }
        Commands::DeleteUpload { shortid } => {
            let state = build_state(config, false).await?;
            delete_upload_event(&state, shortid).await?;
            println!("deleted {shortid}");
        }
        Commands::SweepClaims => {
            let state = build_state(config, false).await?;
            let transferred = claims::sweep_unclaimed(&state.db).await?;
            println!("{transferred} replays re-owned");
        }
        Commands::StuckScan => {
            let state = build_state(config.clone(), false).await?;
            let failed =
                stuck::detect_and_fail_stuck_uploads(&state.db, &config.processing).await?;
            println!("{failed} stuck uploads failed");
        }
    }

    Ok(())
}
