pub mod display;
pub mod foreground;
pub mod install;
pub mod notify;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyebreak_core::{Collaborators, InterruptionDisplay};
use tracing::info;

use super::Platform;
use super::status::FileStatus;
use crate::AppError;
use crate::config::{ClientConfig, DisplayMode};

/// Linux implementation of the cross-platform interface.
pub struct LinuxPlatform {
    notifier: Arc<notify::Notifier>,
    foreground: Arc<foreground::ForegroundApp>,
    status: Arc<FileStatus>,
    display: Arc<dyn InterruptionDisplay>,
}

impl LinuxPlatform {
    pub async fn detect(cfg: &ClientConfig) -> Result<Self, AppError> {
        ensure_console_dbus_env();
        let display: Arc<dyn InterruptionDisplay> = match (&cfg.display_cmd, cfg.display) {
            (Some(cmd), _) => {
                info!("using display_cmd override");
                Arc::new(display::BreakDisplay::new(display::DisplayBackend::Command(
                    cmd.clone(),
                )))
            }
            (None, DisplayMode::Lock) => {
                let backend = display::detect_lock_backend().await?;
                Arc::new(display::BreakDisplay::new(backend))
            }
            (None, DisplayMode::None) => Arc::new(super::NoDisplay),
        };
        let status_path = cfg.status_file.clone().or_else(default_status_path);
        info!(path=?status_path, "status label destination");

        Ok(Self {
            notifier: Arc::new(notify::Notifier::new()),
            foreground: Arc::new(foreground::ForegroundApp::new(cfg.foreground_cmd.clone())),
            status: Arc::new(FileStatus::new(status_path)),
            display,
        })
    }
}

impl Platform for LinuxPlatform {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            notifier: self.notifier.clone(),
            foreground: self.foreground.clone(),
            status: self.status.clone(),
        }
    }

    fn display(&self) -> Arc<dyn InterruptionDisplay> {
        self.display.clone()
    }
}

/// `$XDG_RUNTIME_DIR/eyebreak/label`, falling back to `/run/user/<uid>`.
pub fn default_status_path() -> Option<PathBuf> {
    let runtime = runtime_dir_from_env().unwrap_or_else(default_runtime_dir);
    runtime
        .exists()
        .then(|| runtime.join("eyebreak").join("label"))
}

/// Notifications and the session lock talk to the session bus; make sure we can find it
/// when started outside a graphical session (e.g. from a systemd user unit).
pub fn ensure_console_dbus_env() {
    if std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_some() {
        return;
    }

    let Some(runtime_dir) = find_runtime_dir_with_bus() else {
        return;
    };

    export_runtime_dir(&runtime_dir);
    if let Some(addr) = build_bus_address(&runtime_dir) {
        // SAFETY: runs during platform detection, before any task reads the environment.
        unsafe {
            std::env::set_var("DBUS_SESSION_BUS_ADDRESS", addr);
        }
    }
}

fn find_runtime_dir_with_bus() -> Option<PathBuf> {
    runtime_dir_from_env()
        .and_then(runtime_dir_if_bus_exists)
        .or_else(|| runtime_dir_if_bus_exists(default_runtime_dir()))
}

fn runtime_dir_if_bus_exists(dir: PathBuf) -> Option<PathBuf> {
    dir.join("bus").exists().then_some(dir)
}

fn runtime_dir_from_env() -> Option<PathBuf> {
    std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from)
}

fn default_runtime_dir() -> PathBuf {
    let uid = nix::unistd::geteuid().as_raw();
    PathBuf::from(format!("/run/user/{uid}"))
}

fn export_runtime_dir(runtime: &Path) {
    if std::env::var_os("XDG_RUNTIME_DIR").is_none() {
        // SAFETY: see ensure_console_dbus_env.
        unsafe {
            std::env::set_var("XDG_RUNTIME_DIR", runtime.as_os_str());
        }
    }
}

fn build_bus_address(runtime: &Path) -> Option<String> {
    let bus = runtime.join("bus");
    bus.exists().then(|| format!("unix:path={}", bus.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_address_requires_socket() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(build_bus_address(dir.path()), None);
        assert_eq!(runtime_dir_if_bus_exists(dir.path().to_path_buf()), None);

        std::fs::write(dir.path().join("bus"), b"").unwrap();
        let expected = format!("unix:path={}", dir.path().join("bus").display());
        assert_eq!(build_bus_address(dir.path()), Some(expected));
        assert_eq!(
            runtime_dir_if_bus_exists(dir.path().to_path_buf()),
            Some(dir.path().to_path_buf())
        );
    }
}
