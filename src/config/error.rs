//! Configuration error types.

use std::fmt;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse environment variable.
    Parse {
        key: String,
        value: String,
        error: String,
    },
    /// Missing required environment variable.
    Missing { key: String },
    /// Invalid value for environment variable.
    Invalid { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { key, value, error } => {
                write!(f, "failed to parse {}='{}': {}", key, value, error)
            }
            ConfigError::Missing { key } => {
                write!(f, "missing required environment variable: {}", key)
            }
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_missing() {
        let err = ConfigError::Missing {
            key: "TGVISD_API_ID".into(),
        };
        assert!(err.to_string().contains("TGVISD_API_ID"));
    }

    #[test]
    fn test_display_parse() {
        let err = ConfigError::Parse {
            key: "TGVISD_MYSQL_PORT".into(),
            value: "banana".into(),
            error: "invalid digit".into(),
        };
        let s = err.to_string();
        assert!(s.contains("TGVISD_MYSQL_PORT"));
        assert!(s.contains("banana"));
    }
}
