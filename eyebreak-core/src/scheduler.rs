use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::collab::Collaborators;
use crate::reporter::{IntervalReporter, TickHandler};
use crate::{SchedulerError, lock};

/// Invoked once per cycle with the foreground application name, if it could be determined.
pub type FireHandler = Arc<dyn Fn(Option<String>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Never started, or stopped.
    Idle,
    /// Deadline armed (and the reporter ticking, if configured).
    Running,
    /// Deadline elapsed and the fire handler was triggered; nothing armed until the next start.
    Fired,
}

/// Text of the notification raised when a countdown elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakNotice {
    pub title: String,
    pub body: String,
}

impl Default for BreakNotice {
    fn default() -> Self {
        Self {
            title: "Break Time!".into(),
            body: "It's been a while, time to look out of the window for a bit.".into(),
        }
    }
}

pub struct SchedulerBuilder {
    duration: Duration,
    on_fire: Option<FireHandler>,
    interval: Option<(Duration, TickHandler)>,
    notice: BreakNotice,
    collaborators: Collaborators,
}

impl SchedulerBuilder {
    pub fn on_fire<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<String>) + Send + Sync + 'static,
    {
        self.on_fire = Some(Arc::new(f));
        self
    }

    /// Report the minutes left every `period` while the countdown runs.
    pub fn interval<F>(mut self, period: Duration, on_tick: F) -> Self
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.interval = Some((period, Arc::new(on_tick)));
        self
    }

    pub fn notice(mut self, notice: BreakNotice) -> Self {
        self.notice = notice;
        self
    }

    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Validates the timing configuration. Must run inside a Tokio runtime.
    pub fn build(self) -> Result<CountdownScheduler, SchedulerError> {
        if self.duration.is_zero() {
            return Err(SchedulerError::ZeroDuration);
        }
        if Instant::now().checked_add(self.duration).is_none() {
            return Err(SchedulerError::DurationTooLong);
        }
        let runtime =
            Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;
        let reporter = match self.interval {
            Some((period, on_tick)) => Some(IntervalReporter::new(period, on_tick)?),
            None => None,
        };
        let on_fire = self.on_fire.unwrap_or_else(|| {
            Arc::new(|_| info!("countdown elapsed but no fire handler is configured"))
        });
        Ok(CountdownScheduler {
            inner: Arc::new(Inner {
                duration: self.duration,
                on_fire,
                reporter,
                notice: self.notice,
                collaborators: self.collaborators,
                runtime,
                armed: Mutex::new(Armed {
                    state: SchedulerState::Idle,
                    deadline: None,
                    task: None,
                    generation: 0,
                }),
            }),
        })
    }
}

/// Restartable countdown that fires its handler exactly once per [`start`](Self::start).
///
/// Cloning yields another handle to the same countdown.
#[derive(Clone)]
pub struct CountdownScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    duration: Duration,
    on_fire: FireHandler,
    reporter: Option<IntervalReporter>,
    notice: BreakNotice,
    collaborators: Collaborators,
    runtime: Handle,
    armed: Mutex<Armed>,
}

struct Armed {
    state: SchedulerState,
    deadline: Option<Instant>,
    /// The single pending deadline task.
    task: Option<JoinHandle<()>>,
    /// Bumped by every start/stop; a deadline task only fires if its generation is current.
    generation: u64,
}

impl CountdownScheduler {
    pub fn builder(duration: Duration) -> SchedulerBuilder {
        SchedulerBuilder {
            duration,
            on_fire: None,
            interval: None,
            notice: BreakNotice::default(),
            collaborators: Collaborators::default(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Arm a fresh deadline `duration` from now, replacing any pending one.
    pub fn start(&self) {
        let Some(deadline) = Instant::now().checked_add(self.inner.duration) else {
            warn!(
                duration_secs = self.inner.duration.as_secs(),
                "countdown deadline out of range; not started"
            );
            return;
        };
        let generation = {
            let mut armed = lock(&self.inner.armed);
            if let Some(task) = armed.task.take() {
                task.abort();
                debug!("countdown restarted; previous deadline cancelled");
            }
            let generation = armed.generation.wrapping_add(1);
            armed.generation = generation;
            armed.deadline = Some(deadline);
            armed.state = SchedulerState::Running;
            let weak = Arc::downgrade(&self.inner);
            armed.task = Some(
                self.inner
                    .runtime
                    .spawn(await_deadline(weak, deadline, generation)),
            );
            // Armed under the lock so a concurrent stop() always finds the task to cancel.
            if let Some(reporter) = &self.inner.reporter {
                reporter.arm(deadline);
            }
            generation
        };
        info!(
            duration_secs = self.duration().as_secs(),
            tick_secs = self.inner.reporter.as_ref().map(|r| r.period().as_secs()),
            "countdown started"
        );

        // on_tick runs without the lock held and may itself stop or restart the countdown.
        let current = lock(&self.inner.armed).generation == generation;
        if let Some(reporter) = self.inner.reporter.as_ref().filter(|_| current) {
            reporter.report_now(deadline);
        }
    }

    /// Cancel the pending deadline and the reporter. Safe to call when nothing is armed.
    ///
    /// A fire routine already past its deadline is not cancelled: its handler still runs once.
    pub fn stop(&self) {
        let mut armed = lock(&self.inner.armed);
        armed.generation = armed.generation.wrapping_add(1);
        armed.deadline = None;
        armed.state = SchedulerState::Idle;
        if let Some(task) = armed.task.take() {
            task.abort();
            debug!("countdown stopped");
        }
        if let Some(reporter) = &self.inner.reporter {
            reporter.stop();
        }
    }

    pub fn running(&self) -> bool {
        lock(&self.inner.armed).task.is_some()
    }

    pub fn state(&self) -> SchedulerState {
        lock(&self.inner.armed).state
    }

    /// Deadline of the armed countdown.
    pub fn deadline(&self) -> Option<Instant> {
        lock(&self.inner.armed).deadline
    }
}

impl std::fmt::Debug for CountdownScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownScheduler")
            .field("duration", &self.inner.duration)
            .field("state", &self.state())
            .field("reporter", &self.inner.reporter)
            .finish()
    }
}

async fn await_deadline(inner: Weak<Inner>, deadline: Instant, generation: u64) {
    tokio::time::sleep_until(deadline).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    {
        let mut armed = lock(&inner.armed);
        if armed.generation != generation {
            debug!("stale deadline ignored");
            return;
        }
        // Detach: from here on stop() can no longer cancel this routine.
        armed.task = None;
        armed.deadline = None;
        armed.state = SchedulerState::Fired;
        if let Some(reporter) = &inner.reporter {
            reporter.stop();
        }
    }
    inner.fire().await;
}

impl Inner {
    async fn fire(&self) {
        info!("countdown elapsed; interrupting");
        let Collaborators {
            notifier,
            foreground,
            status,
        } = &self.collaborators;

        status.set_label("");
        notifier
            .notify(&self.notice.title, &self.notice.body)
            .await;

        let context = match foreground.current_foreground_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!(error=%e, "unable to determine foreground application");
                None
            }
        };
        debug!(foreground=?context, "invoking fire handler");
        (self.on_fire)(context);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let armed = self
            .armed
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = armed.task.take() {
            task.abort();
        }
    }
}
