//! Environment variable parsing utilities.

use std::fmt::Display;
use std::str::FromStr;

use super::ConfigError;

/// Get environment variable with default value.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get optional environment variable (None if empty or missing).
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Get required environment variable.
pub fn env_req(key: &str) -> Result<String, ConfigError> {
    env_opt(key).ok_or_else(|| ConfigError::Missing { key: key.into() })
}

/// Parse environment variable with a default, reporting the key on failure.
pub fn env_parse<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env_or(key, default);
    raw.parse().map_err(|e| ConfigError::Parse {
        key: key.into(),
        value: raw,
        error: format!("{e}"),
    })
}

/// Parse an already-fetched value, reporting the key on failure.
pub fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| ConfigError::Parse {
        key: key.into(),
        value: raw.into(),
        error: format!("{e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_default() {
        std::env::remove_var("TGVISD_TEST_ENV_OR");
        assert_eq!(env_or("TGVISD_TEST_ENV_OR", "fallback"), "fallback");
    }

    #[test]
    fn test_env_opt_filters_empty() {
        std::env::set_var("TGVISD_TEST_ENV_OPT", "");
        assert_eq!(env_opt("TGVISD_TEST_ENV_OPT"), None);
        std::env::set_var("TGVISD_TEST_ENV_OPT", "x");
        assert_eq!(env_opt("TGVISD_TEST_ENV_OPT"), Some("x".to_string()));
        std::env::remove_var("TGVISD_TEST_ENV_OPT");
    }

    #[test]
    fn test_env_req_missing() {
        std::env::remove_var("TGVISD_TEST_ENV_REQ");
        assert!(matches!(
            env_req("TGVISD_TEST_ENV_REQ"),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_parse_value() {
        let n: u16 = parse_value("K", "3306").unwrap();
        assert_eq!(n, 3306);
        let err = parse_value::<u16>("K", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
