//! Work queue error types.

use std::fmt;

use super::job::Job;

/// Invalid pool construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker ceiling of zero.
    ZeroWorkers,
    /// Job slot count of zero.
    ZeroJobs,
    /// Idle baseline outside `1..=max_workers`.
    BaselineOutOfRange { baseline: usize, max: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroWorkers => write!(f, "worker count cannot be zero"),
            ConfigError::ZeroJobs => write!(f, "job slot count cannot be zero"),
            ConfigError::BaselineOutOfRange { baseline, max } => {
                write!(
                    f,
                    "idle baseline {} outside valid range 1..={}",
                    baseline, max
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Error from the blocking [`super::WorkQueue::schedule`].
///
/// The rejected job has already been dropped, running its payload
/// destructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The pool is shutting down or already shut down. Not retryable.
    Stopped,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Stopped => write!(f, "work queue is shutting down"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Error from the non-blocking [`super::WorkQueue::try_schedule`].
#[derive(Debug)]
pub enum TryScheduleError {
    /// Every job slot is taken. The job is handed back for a later retry.
    Full(Job),
    /// The pool is shutting down; the job has been dropped.
    Stopped,
}

impl TryScheduleError {
    /// Check if this is a queue full error.
    pub fn is_full(&self) -> bool {
        matches!(self, TryScheduleError::Full(_))
    }

    /// Check if this is a shutdown error.
    pub fn is_stopped(&self) -> bool {
        matches!(self, TryScheduleError::Stopped)
    }

    /// Recover the job from a `Full` rejection.
    pub fn into_job(self) -> Option<Job> {
        match self {
            TryScheduleError::Full(job) => Some(job),
            TryScheduleError::Stopped => None,
        }
    }
}

impl fmt::Display for TryScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryScheduleError::Full(_) => write!(f, "work queue is full"),
            TryScheduleError::Stopped => write!(f, "work queue is shutting down"),
        }
    }
}

impl std::error::Error for TryScheduleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::BaselineOutOfRange {
            baseline: 9,
            max: 8,
        };
        let s = err.to_string();
        assert!(s.contains('9'));
        assert!(s.contains('8'));
    }

    #[test]
    fn test_try_schedule_predicates() {
        let err = TryScheduleError::Full(Job::new(|_| {}));
        assert!(err.is_full());
        assert!(!err.is_stopped());
        assert!(err.into_job().is_some());

        let err = TryScheduleError::Stopped;
        assert!(err.is_stopped());
        assert!(err.into_job().is_none());
    }
}
