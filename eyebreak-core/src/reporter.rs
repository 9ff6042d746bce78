use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::{SchedulerError, lock};

/// Receives the whole minutes left until the deadline (floored, negative once it has passed).
pub type TickHandler = Arc<dyn Fn(i64) + Send + Sync>;

const MILLIS_PER_MINUTE: i128 = 60_000;

/// Whole minutes from `now` until `deadline`, rounded towards negative infinity.
pub fn remaining_minutes(deadline: Instant, now: Instant) -> i64 {
    let millis = if deadline >= now {
        (deadline - now).as_millis() as i128
    } else {
        -((now - deadline).as_millis() as i128)
    };
    millis.div_euclid(MILLIS_PER_MINUTE) as i64
}

/// Periodically reports the time left until a deadline.
///
/// Never stops on its own; the owner stops it when the deadline fires or the
/// countdown is cancelled.
pub struct IntervalReporter {
    period: Duration,
    on_tick: TickHandler,
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalReporter {
    /// Must be called from within a Tokio runtime; the ticking task is spawned on it.
    pub fn new(period: Duration, on_tick: TickHandler) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }
        if Instant::now().checked_add(period).is_none() {
            return Err(SchedulerError::PeriodTooLong);
        }
        let runtime =
            Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;
        Ok(Self {
            period,
            on_tick,
            runtime,
            task: Mutex::new(None),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Report immediately, then once per period until [`stop`](Self::stop).
    /// Restarting replaces the previous ticking task.
    pub fn start(&self, deadline: Instant) {
        self.arm(deadline);
        self.report_now(deadline);
    }

    /// Replace the ticking task without reporting; the first tick lands one period from now.
    pub(crate) fn arm(&self, deadline: Instant) {
        let period = self.period;
        let Some(first) = Instant::now().checked_add(period) else {
            warn!(period_secs = period.as_secs(), "reporting period out of range");
            self.stop();
            return;
        };
        let on_tick = self.on_tick.clone();
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let left = remaining_minutes(deadline, Instant::now());
                trace!(left, "interval reporter tick");
                on_tick(left);
            }
        });

        if let Some(previous) = lock(&self.task).replace(task) {
            previous.abort();
        }
        debug!(period_secs = period.as_secs(), "interval reporter started");
    }

    pub(crate) fn report_now(&self, deadline: Instant) {
        (self.on_tick)(remaining_minutes(deadline, Instant::now()));
    }

    pub fn stop(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
            debug!("interval reporter stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.task).is_some()
    }
}

impl Drop for IntervalReporter {
    fn drop(&mut self) {
        let slot = self
            .task
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for IntervalReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalReporter")
            .field("period", &self.period)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    const MINUTE: Duration = Duration::from_secs(60);

    fn recording() -> (TickHandler, Arc<Mutex<Vec<i64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: TickHandler = Arc::new(move |left| sink.lock().unwrap().push(left));
        (handler, seen)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn remaining_minutes_floors() {
        let now = Instant::now();
        assert_eq!(remaining_minutes(now + Duration::from_secs(300), now), 5);
        assert_eq!(remaining_minutes(now + Duration::from_secs(299), now), 4);
        assert_eq!(remaining_minutes(now + Duration::from_secs(59), now), 0);
        assert_eq!(remaining_minutes(now, now), 0);
    }

    #[test]
    fn remaining_minutes_negative_after_deadline() {
        let deadline = Instant::now();
        assert_eq!(remaining_minutes(deadline, deadline + Duration::from_millis(1)), -1);
        assert_eq!(remaining_minutes(deadline, deadline + Duration::from_secs(60)), -1);
        assert_eq!(remaining_minutes(deadline, deadline + Duration::from_secs(61)), -2);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_zero_period() {
        let (handler, _) = recording();
        let err = IntervalReporter::new(Duration::ZERO, handler).unwrap_err();
        assert!(matches!(err, SchedulerError::ZeroPeriod));
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_unschedulable_period() {
        let (handler, _) = recording();
        let err = IntervalReporter::new(Duration::from_secs(u64::MAX), handler).unwrap_err();
        assert!(matches!(err, SchedulerError::PeriodTooLong));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_from_first_tick_cancels_ticking() {
        let slot: Arc<Mutex<Option<Arc<IntervalReporter>>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (sink, target) = (seen.clone(), slot.clone());
        let handler: TickHandler = Arc::new(move |left| {
            sink.lock().unwrap().push(left);
            if let Some(reporter) = target.lock().unwrap().take() {
                reporter.stop();
            }
        });
        let reporter = Arc::new(IntervalReporter::new(MINUTE, handler).unwrap());
        *slot.lock().unwrap() = Some(reporter.clone());

        reporter.start(Instant::now() + Duration::from_secs(300));
        assert!(!reporter.is_active());
        time::advance(MINUTE * 3).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[test]
    fn requires_runtime() {
        let (handler, _) = recording();
        let err = IntervalReporter::new(MINUTE, handler).unwrap_err();
        assert!(matches!(err, SchedulerError::NoRuntime(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_every_period() {
        let (handler, seen) = recording();
        let reporter = IntervalReporter::new(MINUTE, handler).unwrap();

        reporter.start(Instant::now() + Duration::from_secs(300));
        assert_eq!(*seen.lock().unwrap(), vec![5]);

        time::advance(MINUTE - Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![5]);

        time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![5, 4]);

        time::advance(MINUTE).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![5, 4, 3]);
        reporter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_ticking_past_deadline() {
        let (handler, seen) = recording();
        let reporter = IntervalReporter::new(MINUTE, handler).unwrap();

        reporter.start(Instant::now() + MINUTE);
        for _ in 0..3 {
            time::advance(MINUTE).await;
            settle().await;
        }
        assert_eq!(*seen.lock().unwrap(), vec![1, 0, -1, -2]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_ticks() {
        let (handler, seen) = recording();
        let reporter = IntervalReporter::new(MINUTE, handler).unwrap();
        reporter.stop();
        assert!(!reporter.is_active());

        reporter.start(Instant::now() + Duration::from_secs(600));
        assert!(reporter.is_active());
        reporter.stop();
        reporter.stop();
        assert!(!reporter.is_active());

        time::advance(MINUTE * 3).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_task() {
        let (handler, seen) = recording();
        let reporter = IntervalReporter::new(MINUTE, handler).unwrap();

        reporter.start(Instant::now() + Duration::from_secs(600));
        time::advance(Duration::from_secs(30)).await;
        reporter.start(Instant::now() + Duration::from_secs(300));

        time::advance(MINUTE).await;
        settle().await;
        // one task only: no stray tick from the first start at t=60s
        assert_eq!(*seen.lock().unwrap(), vec![10, 5, 4]);
    }
}
