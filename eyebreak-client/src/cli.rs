use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $EYEBREAK_CONFIG
  3) XDG default: ~/.config/eyebreak/client.yaml (built-in defaults if absent)

Controls while running:
  SIGUSR1  start the countdown and re-enable breaks
  SIGUSR2  stop the countdown and pause breaks
"#;

#[derive(Debug, Parser)]
#[command(
    name = "eyebreak",
    version,
    about = "Break reminder: interrupts you every so often to rest your eyes",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Minutes between breaks (overrides config)
    #[arg(long, value_name = "MINUTES")]
    pub break_mins: Option<u64>,
    /// Seconds between remaining-time label updates (overrides config)
    #[arg(long, value_name = "SECONDS")]
    pub tick_secs: Option<u64>,
    /// Optional subcommand. Without one, runs the agent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exercise notification, foreground lookup and status label once
    Probe {
        /// Also open the break display and wait until it is dismissed
        #[arg(long)]
        display: bool,
    },
    /// Print the effective configuration as YAML
    PrintConfig,
    /// Write a config file with the default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Install a systemd user service that starts the agent at login
    Install,
    /// Remove the systemd user service
    Uninstall,
}
