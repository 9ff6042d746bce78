use std::path::PathBuf;

use tinytemplate::TinyTemplate;
use tokio::process::Command;
use tracing::{info, warn};

use crate::AppError;

const USER_UNIT_NAME: &str = "eyebreak.service";
const USER_UNIT_TEMPLATE: &str = include_str!("../../../systemd/eyebreak.service");

pub async fn install_user_service() -> Result<(), AppError> {
    let unit_dir = user_systemd_unit_dir()?;
    std::fs::create_dir_all(&unit_dir).map_err(AppError::Io)?;
    let unit_path = unit_dir.join(USER_UNIT_NAME);
    let bin_path = resolve_binary_path()?;
    let unit_text = render_user_unit(&bin_path)?;
    std::fs::write(&unit_path, unit_text).map_err(AppError::Io)?;
    info!(path=%unit_path.display(), "install: wrote user systemd unit");

    run_cmd("systemctl", &["--user", "daemon-reload"]).await?;
    run_cmd("systemctl", &["--user", "enable", "--now", USER_UNIT_NAME]).await?;

    println!("Installed {}; eyebreak now starts with your graphical session.", unit_path.display());
    Ok(())
}

pub async fn uninstall_user_service() -> Result<(), AppError> {
    let _ = run_cmd("systemctl", &["--user", "disable", "--now", USER_UNIT_NAME]).await;

    let unit_path = user_systemd_unit_dir()?.join(USER_UNIT_NAME);
    if unit_path.exists() {
        std::fs::remove_file(&unit_path).map_err(AppError::Io)?;
        let _ = run_cmd("systemctl", &["--user", "daemon-reload"]).await;
        info!(path=%unit_path.display(), "uninstall: removed user systemd unit");
    }
    println!("Uninstalled eyebreak user service.");
    Ok(())
}

fn user_systemd_unit_dir() -> Result<PathBuf, AppError> {
    let base = directories::BaseDirs::new()
        .ok_or_else(|| AppError::Config("cannot determine home directory".into()))?;
    Ok(base.config_dir().join("systemd").join("user"))
}

fn resolve_binary_path() -> Result<String, AppError> {
    let exe = std::env::current_exe().map_err(AppError::Io)?;
    Ok(exe.display().to_string())
}

#[derive(serde::Serialize)]
struct UnitCtx<'a> {
    binary_path: &'a str,
}

fn render_user_unit(binary_path: &str) -> Result<String, AppError> {
    let mut tt = TinyTemplate::new();
    tt.add_template("unit", USER_UNIT_TEMPLATE)
        .map_err(|e| AppError::Config(format!("template error: {e}")))?;
    let ctx = UnitCtx { binary_path };
    tt.render("unit", &ctx)
        .map_err(|e| AppError::Config(format!("render error: {e}")))
}

async fn run_cmd(prog: &str, args: &[&str]) -> Result<(), AppError> {
    let status = Command::new(prog).args(args).status().await.map_err(AppError::Io)?;
    if !status.success() {
        warn!(program=%prog, ?args, %status, "command failed");
    }
    Ok(())
}
