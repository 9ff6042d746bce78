use std::process::Stdio;

use async_trait::async_trait;
use eyebreak_core::{ForegroundLookup, LookupError};
use tokio::process::Command;
use tracing::debug;

use crate::AppError;

/// Name of the application owning the focused window.
///
/// Default: `xdotool getactivewindow getwindowpid`, then `/proc/<pid>/comm`.
/// With an override the command's trimmed stdout is the name.
#[derive(Debug, Clone, Default)]
pub struct ForegroundApp {
    cmd: Option<Vec<String>>,
}

impl ForegroundApp {
    pub fn new(cmd: Option<Vec<String>>) -> Self {
        Self { cmd }
    }

    async fn lookup(&self) -> Result<Option<String>, AppError> {
        if let Some(cmd) = &self.cmd {
            let out = capture(cmd).await?;
            return Ok(non_empty(&out));
        }

        let xdotool = ["xdotool", "getactivewindow", "getwindowpid"].map(String::from);
        let out = capture(&xdotool).await?;
        let Some(pid) = parse_pid(&out) else {
            debug!(output=%out.trim(), "foreground: no pid for active window");
            return Ok(None);
        };
        let comm = tokio::fs::read_to_string(format!("/proc/{pid}/comm")).await?;
        Ok(non_empty(&comm))
    }
}

#[async_trait]
impl ForegroundLookup for ForegroundApp {
    async fn current_foreground_name(&self) -> Result<Option<String>, LookupError> {
        Ok(self.lookup().await?)
    }
}

async fn capture(cmd: &[String]) -> Result<String, AppError> {
    let (program, args) = cmd
        .split_first()
        .ok_or_else(|| AppError::Config("foreground command empty".into()))?;
    let out = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;
    if !out.status.success() {
        return Err(AppError::Io(std::io::Error::other(format!(
            "{program} failed with status {}",
            out.status
        ))));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

fn parse_pid(output: &str) -> Option<u32> {
    output.trim().parse().ok()
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
