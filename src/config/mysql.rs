//! MySQL connection settings.

use super::parse::{env_opt, parse_value};
use super::ConfigError;

const DEFAULT_PORT: u16 = 3306;

/// MySQL configuration loaded from environment.
///
/// The whole group is optional: with none of the `TGVISD_MYSQL_*` variables
/// set the daemon runs without persistence. Once any of them is present the
/// host, user, password and database name all become required.
#[derive(Clone, Debug)]
pub struct MysqlConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub db_name: String,
    pub port: u16,
}

impl MysqlConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when the group is absent altogether.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = env_opt("TGVISD_MYSQL_HOST");
        let user = env_opt("TGVISD_MYSQL_USER");
        let pass = env_opt("TGVISD_MYSQL_PASS");
        let db_name = env_opt("TGVISD_MYSQL_DBNAME");
        let port = env_opt("TGVISD_MYSQL_PORT");

        if host.is_none() && user.is_none() && pass.is_none() && db_name.is_none() && port.is_none()
        {
            return Ok(None);
        }

        let require = |key: &str, v: Option<String>| {
            v.ok_or_else(|| ConfigError::Missing { key: key.into() })
        };

        let port = match port {
            Some(raw) => parse_value("TGVISD_MYSQL_PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        Ok(Some(Self {
            host: require("TGVISD_MYSQL_HOST", host)?,
            user: require("TGVISD_MYSQL_USER", user)?,
            pass: require("TGVISD_MYSQL_PASS", pass)?,
            db_name: require("TGVISD_MYSQL_DBNAME", db_name)?,
            port,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 5] = [
        "TGVISD_MYSQL_HOST",
        "TGVISD_MYSQL_USER",
        "TGVISD_MYSQL_PASS",
        "TGVISD_MYSQL_DBNAME",
        "TGVISD_MYSQL_PORT",
    ];

    // One test owning the TGVISD_MYSQL_* keys; splitting it would race.
    #[test]
    fn test_from_env() {
        for k in KEYS {
            std::env::remove_var(k);
        }
        assert!(MysqlConfig::from_env().expect("absent group is ok").is_none());

        std::env::set_var("TGVISD_MYSQL_HOST", "127.0.0.1");
        assert!(matches!(
            MysqlConfig::from_env(),
            Err(ConfigError::Missing { .. })
        ));

        std::env::set_var("TGVISD_MYSQL_USER", "tgvisd");
        std::env::set_var("TGVISD_MYSQL_PASS", "secret");
        std::env::set_var("TGVISD_MYSQL_DBNAME", "greentea");
        let config = MysqlConfig::from_env().expect("ok").expect("present");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.db_name, "greentea");

        std::env::set_var("TGVISD_MYSQL_PORT", "3307");
        let config = MysqlConfig::from_env().expect("ok").expect("present");
        assert_eq!(config.port, 3307);

        std::env::set_var("TGVISD_MYSQL_PORT", "eleventy");
        assert!(matches!(
            MysqlConfig::from_env(),
            Err(ConfigError::Parse { .. })
        ));

        for k in KEYS {
            std::env::remove_var(k);
        }
    }
}
