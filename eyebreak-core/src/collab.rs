use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

/// Error type returned by foreground lookups. The scheduler only logs it.
pub type LookupError = Box<dyn std::error::Error + Send + Sync>;

/// Raises the "break started" alert. Fire-and-forget: implementations swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}

/// Reports the name of the application the user was working in.
#[async_trait]
pub trait ForegroundLookup: Send + Sync {
    async fn current_foreground_name(&self) -> Result<Option<String>, LookupError>;
}

/// Shows the blocking break view.
///
/// `open` returns right away; `on_closed` must be called exactly once, when the
/// user dismisses the view (or when it could not be shown at all).
pub trait InterruptionDisplay: Send + Sync {
    fn open(&self, on_closed: Box<dyn FnOnce() + Send + 'static>);
}

/// Best-effort remaining-time label (tray title, status bar file, ...).
pub trait StatusSurface: Send + Sync {
    fn set_label(&self, text: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) {
        info!(%title, %body, "break notification");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoForeground;

#[async_trait]
impl ForegroundLookup for NoForeground {
    async fn current_foreground_name(&self) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatus;

impl StatusSurface for NoStatus {
    fn set_label(&self, text: &str) {
        debug!(label = text, "status label");
    }
}

/// Collaborators handed to a scheduler at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub foreground: Arc<dyn ForegroundLookup>,
    pub status: Arc<dyn StatusSurface>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            notifier: Arc::new(LogNotifier),
            foreground: Arc::new(NoForeground),
            status: Arc::new(NoStatus),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
