use cronlink_core::ScheduleError;
use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The expression was rejected by the cron parser.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    /// The expression parsed but never fires again.
    #[error("Schedule has no upcoming run: {0}")]
    Exhausted(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
