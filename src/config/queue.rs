//! Work queue sizing.

use std::num::NonZeroUsize;

use super::parse::env_parse;
use super::ConfigError;
use crate::queue::PoolConfig;

const DEFAULT_WORKERS: usize = 64;
const DEFAULT_JOBS: usize = 4096;

/// Work queue sizing loaded from environment.
///
/// All values are pre-computed at construction time; sizes never change
/// after startup.
#[derive(Clone, Debug)]
pub struct QueueSettings {
    /// Resolved worker ceiling (never zero).
    max_workers: NonZeroUsize,
    /// Resolved job slot count (never zero).
    max_jobs: NonZeroUsize,
    /// Always-on worker count; `None` lets the pool pick max/2.
    idle_workers: Option<NonZeroUsize>,
}

impl QueueSettings {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_workers = Self::parse_workers()?;
        let max_jobs = Self::parse_jobs()?;
        let idle_workers = Self::parse_idle_workers(max_workers)?;

        Ok(Self {
            max_workers,
            max_jobs,
            idle_workers,
        })
    }

    /// Build settings programmatically, bypassing the environment.
    pub fn new(
        max_workers: usize,
        max_jobs: usize,
        idle_workers: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let max_workers = NonZeroUsize::new(max_workers).ok_or_else(|| ConfigError::Invalid {
            key: "TGVISD_WORKERS".into(),
            message: "worker count cannot be zero".into(),
        })?;
        let max_jobs = NonZeroUsize::new(max_jobs).ok_or_else(|| ConfigError::Invalid {
            key: "TGVISD_JOBS".into(),
            message: "job slot count cannot be zero".into(),
        })?;
        let idle_workers = match idle_workers {
            None => None,
            Some(idle) => {
                let idle = NonZeroUsize::new(idle).ok_or_else(|| ConfigError::Invalid {
                    key: "TGVISD_IDLE_WORKERS".into(),
                    message: "idle worker count cannot be zero".into(),
                })?;
                if idle > max_workers {
                    return Err(ConfigError::Invalid {
                        key: "TGVISD_IDLE_WORKERS".into(),
                        message: format!(
                            "idle workers ({}) exceed worker ceiling ({})",
                            idle, max_workers
                        ),
                    });
                }
                Some(idle)
            }
        };
        Ok(Self {
            max_workers,
            max_jobs,
            idle_workers,
        })
    }

    /// Get the worker ceiling (pre-computed, zero-cost).
    #[inline]
    pub fn max_workers(&self) -> usize {
        self.max_workers.get()
    }

    /// Get the job slot count (pre-computed, zero-cost).
    #[inline]
    pub fn max_jobs(&self) -> usize {
        self.max_jobs.get()
    }

    /// Get the configured idle baseline, if any.
    #[inline]
    pub fn idle_workers(&self) -> Option<usize> {
        self.idle_workers.map(NonZeroUsize::get)
    }

    /// Pool construction parameters.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_workers: self.max_workers(),
            max_jobs: self.max_jobs(),
            idle_workers: self.idle_workers(),
        }
    }

    fn parse_workers() -> Result<NonZeroUsize, ConfigError> {
        let workers: usize = env_parse("TGVISD_WORKERS", &DEFAULT_WORKERS.to_string())?;

        // Resolve 0 to CPU count
        let count = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };

        NonZeroUsize::new(count).ok_or_else(|| ConfigError::Invalid {
            key: "TGVISD_WORKERS".into(),
            message: "worker count cannot be zero".into(),
        })
    }

    fn parse_jobs() -> Result<NonZeroUsize, ConfigError> {
        let jobs: usize = env_parse("TGVISD_JOBS", &DEFAULT_JOBS.to_string())?;
        NonZeroUsize::new(jobs).ok_or_else(|| ConfigError::Invalid {
            key: "TGVISD_JOBS".into(),
            message: "job slot count cannot be zero".into(),
        })
    }

    fn parse_idle_workers(max: NonZeroUsize) -> Result<Option<NonZeroUsize>, ConfigError> {
        let Some(raw) = super::parse::env_opt("TGVISD_IDLE_WORKERS") else {
            return Ok(None);
        };
        let idle: usize = super::parse::parse_value("TGVISD_IDLE_WORKERS", &raw)?;
        let idle = NonZeroUsize::new(idle).ok_or_else(|| ConfigError::Invalid {
            key: "TGVISD_IDLE_WORKERS".into(),
            message: "idle worker count cannot be zero".into(),
        })?;
        if idle > max {
            return Err(ConfigError::Invalid {
                key: "TGVISD_IDLE_WORKERS".into(),
                message: format!("idle workers ({}) exceed worker ceiling ({})", idle, max),
            });
        }
        Ok(Some(idle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 3] = ["TGVISD_WORKERS", "TGVISD_JOBS", "TGVISD_IDLE_WORKERS"];

    #[test]
    fn test_new_validation() {
        assert!(QueueSettings::new(8, 128, None).is_ok());
        assert!(QueueSettings::new(8, 128, Some(8)).is_ok());
        assert!(matches!(
            QueueSettings::new(0, 128, None),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            QueueSettings::new(8, 0, None),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            QueueSettings::new(8, 128, Some(0)),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            QueueSettings::new(8, 128, Some(9)),
            Err(ConfigError::Invalid { .. })
        ));
    }

    // One test owning the sizing keys; splitting it would race.
    #[test]
    fn test_from_env() {
        for k in KEYS {
            std::env::remove_var(k);
        }
        let settings = QueueSettings::from_env().expect("defaults load");
        assert_eq!(settings.max_workers(), DEFAULT_WORKERS);
        assert_eq!(settings.max_jobs(), DEFAULT_JOBS);
        assert_eq!(settings.idle_workers(), None);

        std::env::set_var("TGVISD_WORKERS", "0");
        let settings = QueueSettings::from_env().expect("0 resolves to cpu count");
        assert!(settings.max_workers() >= 1);

        std::env::set_var("TGVISD_WORKERS", "8");
        std::env::set_var("TGVISD_IDLE_WORKERS", "0");
        assert!(matches!(
            QueueSettings::from_env(),
            Err(ConfigError::Invalid { .. })
        ));

        std::env::set_var("TGVISD_IDLE_WORKERS", "9");
        assert!(matches!(
            QueueSettings::from_env(),
            Err(ConfigError::Invalid { .. })
        ));

        std::env::set_var("TGVISD_IDLE_WORKERS", "2");
        let settings = QueueSettings::from_env().expect("valid baseline");
        assert_eq!(settings.idle_workers(), Some(2));
        let pool = settings.pool_config();
        assert_eq!(pool.max_workers, 8);
        assert_eq!(pool.idle_workers, Some(2));

        for k in KEYS {
            std::env::remove_var(k);
        }
    }
}
