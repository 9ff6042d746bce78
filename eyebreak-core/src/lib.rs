//! Interruption scheduling for eyebreak.
//!
//! A [`CountdownScheduler`] arms one deadline per cycle and fires a handler
//! exactly once when it elapses, while an optional [`IntervalReporter`]
//! reports the minutes left at its own cadence. Everything the scheduler
//! touches outside of timing (notifications, foreground lookup, the status
//! label) goes through the collaborator traits in [`collab`].

pub mod collab;
pub mod reporter;
pub mod scheduler;

pub use collab::{
    Collaborators, ForegroundLookup, InterruptionDisplay, LogNotifier, LookupError, NoForeground,
    NoStatus, Notifier, StatusSurface,
};
pub use reporter::{IntervalReporter, TickHandler, remaining_minutes};
pub use scheduler::{
    BreakNotice, CountdownScheduler, FireHandler, SchedulerBuilder, SchedulerState,
};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("countdown duration must be positive")]
    ZeroDuration,
    #[error("reporting period must be positive")]
    ZeroPeriod,
    #[error("countdown duration is too long to schedule")]
    DurationTooLong,
    #[error("reporting period is too long to schedule")]
    PeriodTooLong,
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Lock a std mutex, recovering the data if a callback panicked while holding it.
pub(crate) fn lock<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
