use std::sync::Arc;

use eyebreak_core::Collaborators;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::platform::Platform;

/// Exercise each platform integration once and print what worked.
pub async fn run(platform: Arc<dyn Platform>, with_display: bool) {
    info!(platform = platform.name(), "probe starting");
    let mut report: Vec<(&str, String)> = Vec::new();
    let Collaborators {
        notifier,
        foreground,
        status,
    } = platform.collaborators();

    notifier
        .notify(
            "eyebreak probe",
            "If you can read this, break notifications work.",
        )
        .await;
    report.push(("notification", "sent (check your desktop)".into()));

    let fg = match foreground.current_foreground_name().await {
        Ok(Some(name)) => name,
        Ok(None) => "unknown".into(),
        Err(e) => {
            error!(error=%e, "foreground lookup failed");
            format!("failed: {e}")
        }
    };
    report.push(("foreground application", fg));

    status.set_label("probe");
    report.push(("status label", "set to 'probe'".into()));

    if with_display {
        let (tx, rx) = oneshot::channel();
        platform.display().open(Box::new(move || {
            let _ = tx.send(());
        }));
        info!("waiting for the break display to be dismissed");
        let outcome = match rx.await {
            Ok(()) => "opened and dismissed".to_string(),
            Err(_) => {
                error!("break display dropped without reporting close");
                "never reported close".to_string()
            }
        };
        report.push(("break display", outcome));
    }
    status.set_label("");

    println!("Summary:");
    for (what, result) in report {
        println!("- {what}: {result}");
    }
    info!("probe finished");
}
