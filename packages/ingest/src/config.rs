use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. When false, uploads are accepted but not
    /// enqueued (a local consumer must drive them explicitly).
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL.
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue the upload-processing messages travel on.
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "upload_events".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the filesystem blob store.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum accepted raw log size in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_storage_root() -> String {
    "./blobs".into()
}
fn default_max_upload_size() -> u64 {
    50 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    /// Half-width of the symmetric match-start tolerance window used
    /// for deduplication. Absorbs client/server clock drift.
    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: i64,
    /// Age after which a record still in Processing counts as stuck.
    #[serde(default = "default_stuck_timeout_secs")]
    pub stuck_timeout_secs: u64,
    /// How often the stuck-record detector scans.
    #[serde(default = "default_stuck_scan_interval_secs")]
    pub stuck_scan_interval_secs: u64,
}

fn default_dedup_window_hours() -> i64 {
    6
}
fn default_stuck_timeout_secs() -> u64 {
    1800
}
fn default_stuck_scan_interval_secs() -> u64 {
    300
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            dedup_window_hours: default_dedup_window_hours(),
            stuck_timeout_secs: default_stuck_timeout_secs(),
            stuck_scan_interval_secs: default_stuck_scan_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("database.url", "postgres://localhost/hearthvault")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., HEARTHVAULT__DATABASE__URL)
            .add_source(Environment::with_prefix("HEARTHVAULT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
