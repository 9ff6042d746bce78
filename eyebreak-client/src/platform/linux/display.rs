use std::process::Stdio;
use std::time::Duration;

use eyebreak_core::InterruptionDisplay;
use tokio::process::Command;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use zbus::proxy::Proxy;
use zbus_names::OwnedBusName;

use crate::AppError;

const UNLOCK_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How long to wait for the screen to report locked before treating the break as over.
const LOCK_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayBackend {
    Gnome,
    Login1,
    /// Blocking program; the break ends when it exits.
    Command(Vec<String>),
}

pub async fn detect_lock_backend() -> Result<DisplayBackend, AppError> {
    if has_owner(zbus::Connection::session().await, "org.gnome.ScreenSaver").await {
        info!("detected org.gnome.ScreenSaver on session bus");
        return Ok(DisplayBackend::Gnome);
    }
    if has_owner(zbus::Connection::system().await, "org.freedesktop.login1").await {
        info!("detected org.freedesktop.login1 on system bus");
        return Ok(DisplayBackend::Login1);
    }
    Err(AppError::Dbus(
        "no supported DBus lock interface detected and no display_cmd set".into(),
    ))
}

async fn has_owner(conn: zbus::Result<zbus::Connection>, name: &str) -> bool {
    let Ok(conn) = conn else {
        return false;
    };
    let Ok(proxy) = zbus::fdo::DBusProxy::new(&conn).await else {
        return false;
    };
    let Ok(bus_name) = OwnedBusName::try_from(name) else {
        return false;
    };
    proxy.name_has_owner(bus_name.into()).await.unwrap_or(false)
}

/// Shows a break by locking the session (or running a command) and reports
/// back once the user is at the desktop again.
#[derive(Debug, Clone)]
pub struct BreakDisplay {
    backend: DisplayBackend,
}

impl BreakDisplay {
    pub fn new(backend: DisplayBackend) -> Self {
        Self { backend }
    }
}

impl InterruptionDisplay for BreakDisplay {
    fn open(&self, on_closed: Box<dyn FnOnce() + Send + 'static>) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            if let Err(e) = show_break(&backend).await {
                warn!(error=%e, ?backend, "break display failed");
            }
            info!(
                secs = started.elapsed().as_secs(),
                "break display closed"
            );
            on_closed();
        });
    }
}

async fn show_break(backend: &DisplayBackend) -> Result<(), AppError> {
    match backend {
        DisplayBackend::Gnome => {
            lock_via_gnome_screensaver().await?;
            wait_for_unlock(gnome_screensaver_active).await
        }
        DisplayBackend::Login1 => {
            lock_via_login1().await?;
            wait_for_unlock(login1_locked_hint).await
        }
        DisplayBackend::Command(cmd) => run_until_exit(cmd).await,
    }
}

/// Wait for `locked` to report true (bounded), then until it reports false.
async fn wait_for_unlock<F, Fut>(locked: F) -> Result<(), AppError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<bool, AppError>>,
{
    let settle_deadline = Instant::now() + LOCK_SETTLE_TIMEOUT;
    while !locked().await? {
        if Instant::now() >= settle_deadline {
            warn!("session never reported locked; ending break");
            return Ok(());
        }
        sleep(UNLOCK_POLL_INTERVAL).await;
    }
    debug!("session locked; waiting for unlock");
    while locked().await? {
        sleep(UNLOCK_POLL_INTERVAL).await;
    }
    Ok(())
}

async fn gnome_proxy() -> Result<Proxy<'static>, AppError> {
    let conn = zbus::Connection::session()
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))?;
    Proxy::new(
        &conn,
        "org.gnome.ScreenSaver",
        "/org/gnome/ScreenSaver",
        "org.gnome.ScreenSaver",
    )
    .await
    .map_err(|e| AppError::Dbus(e.to_string()))
}

async fn lock_via_gnome_screensaver() -> Result<(), AppError> {
    gnome_proxy()
        .await?
        .call_method("Lock", &())
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))?;
    Ok(())
}

async fn gnome_screensaver_active() -> Result<bool, AppError> {
    let active: bool = gnome_proxy()
        .await?
        .call("GetActive", &())
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))?;
    Ok(active)
}

async fn lock_via_login1() -> Result<(), AppError> {
    let conn = zbus::Connection::system()
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))?;
    let proxy = Proxy::new(
        &conn,
        "org.freedesktop.login1",
        "/org/freedesktop/login1",
        "org.freedesktop.login1.Manager",
    )
    .await
    .map_err(|e| AppError::Dbus(e.to_string()))?;
    proxy
        .call_method("LockSessions", &())
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))?;
    Ok(())
}

async fn login1_locked_hint() -> Result<bool, AppError> {
    let conn = zbus::Connection::system()
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))?;
    let proxy = Proxy::new(
        &conn,
        "org.freedesktop.login1",
        "/org/freedesktop/login1/session/auto",
        "org.freedesktop.login1.Session",
    )
    .await
    .map_err(|e| AppError::Dbus(e.to_string()))?;
    proxy
        .get_property::<bool>("LockedHint")
        .await
        .map_err(|e| AppError::Dbus(e.to_string()))
}

async fn run_until_exit(cmd: &[String]) -> Result<(), AppError> {
    let (program, args) = cmd
        .split_first()
        .ok_or_else(|| AppError::Config("display_cmd empty".into()))?;
    info!(program=%program, args=?args, "running break display command");
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if !status.success() {
        return Err(AppError::Io(std::io::Error::other(format!(
            "display command failed with status {status}"
        ))));
    }
    Ok(())
}
