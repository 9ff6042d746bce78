use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod app;
pub mod cli;
pub mod config;
pub mod platform;

pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dbus error: {0}")]
    Dbus(String),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] eyebreak_core::SchedulerError),
    #[error("agent task failed: {0}")]
    Agent(#[from] tokio::task::JoinError),
}

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Console logging from `RUST_LOG` (default `info`), plus a daily log file when `log_dir` is set.
/// The returned guard must be held until exit so buffered file output is flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "eyebreak.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();
    guard
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(Command::InitConfig { force }) = &cli.command {
        let (path, _) = resolve_config_path(cli.config.clone())?;
        if path.exists() && !force {
            return Err(AppError::Config(format!(
                "{} already exists; pass --force to overwrite",
                path.display()
            )));
        }
        config::save_config(&path, &ClientConfig::default())?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let (cfg_path, mut cfg) = ClientConfig::find_and_load(cli.config.clone())?;
    cfg.apply_overrides(cli.break_mins, cli.tick_secs);
    cfg.validate()?;

    let _log_guard = init_tracing(cfg.log_dir.as_deref());
    info!(path=?cfg_path, "loaded config");

    if let Some(cmd) = &cli.command {
        match cmd {
            Command::PrintConfig => {
                print!("{}", config::to_yaml(&cfg)?);
                return Ok(());
            }
            Command::Probe { display } => {
                let plat = platform::detect(&cfg).await?;
                app::probe::run(plat, *display).await;
                return Ok(());
            }
            Command::Install => {
                return platform::install().await;
            }
            Command::Uninstall => {
                return platform::uninstall().await;
            }
            Command::InitConfig { .. } => unreachable!("handled before config load"),
        }
    }

    let plat = platform::detect(&cfg).await?;
    info!(platform = plat.name(), "platform selected");

    let agent = app::agent::Agent::new(&cfg, plat)?;
    let controls = app::agent::control_signals();

    let cancel = CancellationToken::new();
    let cancel_child = cancel.child_token();
    let handle = tokio::spawn(async move { agent.run(cancel_child, controls).await });
    supervise(handle, cancel, app::agent::shutdown_signal()).await
}

/// Wait for the agent or a shutdown request, then give the agent a grace period to stop.
/// The agent's own result is returned; a panicked agent becomes [`AppError::Agent`].
async fn supervise(
    mut handle: JoinHandle<Result<(), AppError>>,
    cancel: CancellationToken,
    shutdown: impl Future<Output = ()>,
) -> Result<(), AppError> {
    let joined = tokio::select! {
        _ = shutdown => {
            info!("shutdown signal received; requesting agent to stop");
            cancel.cancel();
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "agent did not stop in time; aborting");
                    handle.abort();
                    return Ok(());
                }
            }
        }
        joined = &mut handle => joined,
    };

    match joined {
        Ok(Ok(())) => {
            info!("agent finished");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error=%e, "agent failed");
            Err(e)
        }
        Err(e) => {
            error!(error=%e, "agent task panicked or was cancelled");
            Err(e.into())
        }
    }
}
