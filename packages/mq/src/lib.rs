pub mod config;
pub mod error;
pub mod models;

pub use config::ConsumeConfig;
pub use error::MqError;
pub use models::{BrokerMessage, BroccoliError, MqBuilder, MqConfig, MqQueue, init_mq};

pub type Mq = MqQueue;
