//! Configuration module for tgvisd.
//!
//! This module provides centralized configuration loading from environment
//! variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use tgvisd::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Data path: {:?}", config.telegram.data_path);
//! println!("Workers: {}", config.queue.max_workers());
//! ```

mod error;
mod logging;
mod mysql;
mod parse;
mod queue;
mod telegram;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use mysql::MysqlConfig;
pub use queue::QueueSettings;
pub use telegram::TelegramConfig;

/// Complete daemon configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram client configuration.
    pub telegram: TelegramConfig,
    /// MySQL configuration, absent when persistence is disabled.
    pub mysql: Option<MysqlConfig>,
    /// Work queue sizing.
    pub queue: QueueSettings,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            telegram: TelegramConfig::from_env()?,
            mysql: MysqlConfig::from_env()?,
            queue: QueueSettings::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("Data path: {:?}", self.telegram.data_path);
        info!("Workers: {} max", self.queue.max_workers());
        info!("Job slots: {}", self.queue.max_jobs());
        match self.queue.idle_workers() {
            Some(n) => info!("Idle workers: {}", n),
            None => info!("Idle workers: auto"),
        }

        match &self.mysql {
            Some(m) => info!("MySQL: {}@{}:{}/{}", m.user, m.host, m.port, m.db_name),
            None => info!("MySQL: disabled"),
        }
    }
}
