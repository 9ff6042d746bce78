#[cfg(not(target_os = "windows"))]
pub mod linux;
pub mod status;

use std::sync::Arc;

use eyebreak_core::{Collaborators, InterruptionDisplay};
use tracing::{info, warn};

use crate::{AppError, config::ClientConfig};

/// Host integration the agent needs: how to alert, who is in the foreground,
/// how to show a break and where the remaining-time label goes.
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;

    fn collaborators(&self) -> Collaborators;

    fn display(&self) -> Arc<dyn InterruptionDisplay>;
}

/// Detect the current platform and return an implementation.
pub async fn detect(cfg: &ClientConfig) -> Result<Arc<dyn Platform>, AppError> {
    #[cfg(not(target_os = "windows"))]
    {
        let plat = linux::LinuxPlatform::detect(cfg).await?;
        Ok(Arc::new(plat))
    }
    #[cfg(target_os = "windows")]
    {
        warn!("no native integration on this platform; breaks are logged only");
        Ok(Arc::new(HeadlessPlatform::new(cfg)))
    }
}

pub async fn install() -> Result<(), AppError> {
    #[cfg(not(target_os = "windows"))]
    {
        linux::install::install_user_service().await
    }
    #[cfg(target_os = "windows")]
    {
        Err(AppError::Config("install is only supported on Linux".into()))
    }
}

pub async fn uninstall() -> Result<(), AppError> {
    #[cfg(not(target_os = "windows"))]
    {
        linux::install::uninstall_user_service().await
    }
    #[cfg(target_os = "windows")]
    {
        Err(AppError::Config("uninstall is only supported on Linux".into()))
    }
}

/// Display that ends the break as soon as it starts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDisplay;

impl InterruptionDisplay for NoDisplay {
    fn open(&self, on_closed: Box<dyn FnOnce() + Send + 'static>) {
        info!("break display disabled; break ends immediately");
        on_closed();
    }
}

/// Log-only platform used where no native integration exists.
pub struct HeadlessPlatform {
    status: Arc<status::FileStatus>,
}

impl HeadlessPlatform {
    pub fn new(cfg: &ClientConfig) -> Self {
        if cfg.display_cmd.is_some() || cfg.foreground_cmd.is_some() {
            warn!("command overrides are ignored on this platform");
        }
        Self {
            status: Arc::new(status::FileStatus::new(cfg.status_file.clone())),
        }
    }
}

impl Platform for HeadlessPlatform {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            status: self.status.clone(),
            ..Collaborators::default()
        }
    }

    fn display(&self) -> Arc<dyn InterruptionDisplay> {
        Arc::new(NoDisplay)
    }
}
