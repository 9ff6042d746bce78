use std::sync::Arc;

use eyebreak_core::{CountdownScheduler, StatusSurface};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::platform::Platform;
use crate::platform::status::LabelTemplate;
use crate::AppError;

#[derive(Debug)]
enum AgentEvent {
    /// Countdown elapsed; the break should start.
    Fired { foreground: Option<String> },
    /// The break display was dismissed.
    BreakOver,
}

/// User controls (the tray menu's Start/Stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Stop,
}

/// Owns the break cycle: countdown → break display → countdown, while enabled.
pub struct Agent {
    scheduler: CountdownScheduler,
    platform: Arc<dyn Platform>,
    status: Arc<dyn StatusSurface>,
    events_tx: mpsc::UnboundedSender<AgentEvent>,
    events_rx: mpsc::UnboundedReceiver<AgentEvent>,
    /// Cleared by Stop; a closing break display only restarts the countdown while set.
    enabled: bool,
    on_break: bool,
    breaks_taken: u64,
}

impl Agent {
    pub fn new(cfg: &ClientConfig, platform: Arc<dyn Platform>) -> Result<Self, AppError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let collaborators = platform.collaborators();
        let status = collaborators.status.clone();
        let template = LabelTemplate::new(&cfg.label_template)?;

        let fire_tx = events_tx.clone();
        let tick_status = status.clone();
        let scheduler = CountdownScheduler::builder(cfg.break_interval())
            .on_fire(move |foreground| {
                if fire_tx.send(AgentEvent::Fired { foreground }).is_err() {
                    debug!("agent gone; dropping fire event");
                }
            })
            .interval(cfg.tick_interval(), move |left| {
                tick_status.set_label(&template.render(left));
            })
            .notice((&cfg.notification).into())
            .collaborators(collaborators)
            .build()?;

        Ok(Self {
            scheduler,
            platform,
            status,
            events_tx,
            events_rx,
            enabled: cfg.start_enabled,
            on_break: false,
            breaks_taken: 0,
        })
    }

    pub async fn run(
        mut self,
        cancel: CancellationToken,
        mut controls: mpsc::Receiver<Control>,
    ) -> Result<(), AppError> {
        if self.enabled {
            self.scheduler.start();
        } else {
            info!("breaks paused at startup; send SIGUSR1 to start");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => { break; }
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                Some(control) = controls.recv() => self.handle_control(control),
            }
        }

        self.scheduler.stop();
        self.status.set_label("");
        info!(breaks = self.breaks_taken, "agent stopped");
        Ok(())
    }

    pub fn handle_control(&mut self, control: Control) {
        match control {
            Control::Start => {
                self.enabled = true;
                if self.on_break {
                    info!("break in progress; countdown resumes when it ends");
                } else {
                    self.scheduler.start();
                }
            }
            Control::Stop => {
                self.enabled = false;
                self.scheduler.stop();
                self.status.set_label("");
                info!("breaks paused");
            }
        }
    }

    fn handle_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Fired { foreground } => {
                // A fire whose lookup was still in flight when Stop arrived.
                if !self.enabled {
                    info!("countdown elapsed while paused; skipping break");
                    return;
                }
                if self.on_break {
                    debug!("break already in progress; ignoring fire");
                    return;
                }
                self.breaks_taken += 1;
                let at = chrono::Local::now().format("%H:%M");
                info!(foreground=?foreground, breaks = self.breaks_taken, %at, "break started");

                self.status.set_label("");
                self.scheduler.stop();
                self.on_break = true;
                let tx = self.events_tx.clone();
                self.platform.display().open(Box::new(move || {
                    let _ = tx.send(AgentEvent::BreakOver);
                }));
            }
            AgentEvent::BreakOver => {
                self.on_break = false;
                self.scheduler.stop();
                if self.enabled {
                    info!("break over; restarting countdown");
                    self.scheduler.start();
                } else {
                    info!("break over; breaks are paused");
                }
            }
        }
    }
}

/// SIGUSR1 → [`Control::Start`], SIGUSR2 → [`Control::Stop`].
pub fn control_signals() -> mpsc::Receiver<Control> {
    let (tx, rx) = mpsc::channel(8);
    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        let (mut start, mut stop) = match (
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        ) {
            (Ok(start), Ok(stop)) => (start, stop),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error=%e, "control signals unavailable");
                return;
            }
        };
        loop {
            let control = tokio::select! {
                Some(()) = start.recv() => Control::Start,
                Some(()) = stop.recv() => Control::Stop,
                else => break,
            };
            info!(?control, "control signal received");
            if tx.send(control).await.is_err() {
                break;
            }
        }
    });
    #[cfg(not(unix))]
    {
        drop(tx);
        warn!("start/stop signals are not supported on this platform");
    }
    rx
}

pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigint = signal(SignalKind::interrupt()).expect("listen SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("listen SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {
                info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("listen for ctrl_c");
        info!("shutdown: received ctrl_c");
    }
}
