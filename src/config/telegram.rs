//! Telegram API credentials and data directory.

use std::path::PathBuf;

use super::parse::{env_req, parse_value};
use super::ConfigError;

/// Telegram client configuration loaded from environment.
///
/// All three variables are required; the daemon refuses to start without
/// them.
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    /// Application identifier issued by my.telegram.org.
    pub api_id: u32,
    /// Application hash paired with `api_id`.
    pub api_hash: String,
    /// Directory holding the tdlib database and files.
    pub data_path: PathBuf,
}

impl TelegramConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_id = env_req("TGVISD_API_ID")?;
        let api_id = parse_value("TGVISD_API_ID", &raw_id)?;
        let api_hash = env_req("TGVISD_API_HASH")?;
        let data_path = PathBuf::from(env_req("TGVISD_DATA_PATH")?);

        Ok(Self {
            api_id,
            api_hash,
            data_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the shared TGVISD_API_* keys are not mutated
    // concurrently by sibling tests.
    #[test]
    fn test_from_env() {
        std::env::remove_var("TGVISD_API_ID");
        std::env::remove_var("TGVISD_API_HASH");
        std::env::remove_var("TGVISD_DATA_PATH");
        assert!(matches!(
            TelegramConfig::from_env(),
            Err(ConfigError::Missing { .. })
        ));

        std::env::set_var("TGVISD_API_ID", "12345");
        std::env::set_var("TGVISD_API_HASH", "deadbeef");
        std::env::set_var("TGVISD_DATA_PATH", "/var/lib/tgvisd");
        let config = TelegramConfig::from_env().expect("should load");
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "deadbeef");
        assert_eq!(config.data_path, PathBuf::from("/var/lib/tgvisd"));

        std::env::set_var("TGVISD_API_ID", "not-a-number");
        assert!(matches!(
            TelegramConfig::from_env(),
            Err(ConfigError::Parse { .. })
        ));

        std::env::remove_var("TGVISD_API_ID");
        std::env::remove_var("TGVISD_API_HASH");
        std::env::remove_var("TGVISD_DATA_PATH");
    }
}
