use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

const APP_NAME: &str = "eyebreak";
/// Each break replaces the previous notification instead of stacking them.
const REPLACE_ID: u32 = 2020;

/// Desktop notifications via notify-rust. After the first failure it falls back to logging.
#[derive(Debug)]
pub struct Notifier {
    replace_id: u32,
    log_only: AtomicBool,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        debug!("Linux notifier created");
        Self {
            replace_id: REPLACE_ID,
            log_only: AtomicBool::new(false),
        }
    }

    pub fn is_log_only(&self) -> bool {
        self.log_only.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl eyebreak_core::Notifier for Notifier {
    async fn notify(&self, title: &str, body: &str) {
        if self.is_log_only() {
            info!("[BREAK] {title}: {body}");
            return;
        }
        debug!(replace_id = self.replace_id, "notify: building notification");
        let mut n = notify_rust::Notification::new();
        let res = n
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .id(self.replace_id)
            .urgency(notify_rust::Urgency::Critical)
            .show_async()
            .await;
        match res {
            Ok(_) => debug!("notify: notification shown"),
            Err(e) => {
                warn!(error=%e, "notify-rust failed; downgrading to log-only notifier");
                self.log_only.store(true, Ordering::Relaxed);
                info!("[BREAK] {title}: {body}");
            }
        }
    }
}
