use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use eyebreak_core::BreakNotice;
use serde::{Deserialize, Serialize};

use crate::AppError;

pub const ENV_CONFIG: &str = "EYEBREAK_CONFIG";
/// Upper bound for both intervals: one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub break_interval_secs: u64,
    pub tick_interval_secs: u64,
    pub notification: NotificationConfig,
    /// TinyTemplate source for the remaining-time label; `{minutes}` is the only field.
    pub label_template: String,
    /// File the label is written to, for status bars. Defaults to `$XDG_RUNTIME_DIR/eyebreak/label`.
    pub status_file: Option<PathBuf>,
    pub display: DisplayMode,
    /// Optional override for the break display. Example: ["swaylock", "-f", "-c", "000000"]
    pub display_cmd: Option<Vec<String>>,
    /// Optional override for foreground lookup; must print the application name to stdout.
    pub foreground_cmd: Option<Vec<String>>,
    pub start_enabled: bool,
    /// When set, logs are also written to a daily rotated file in this directory.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Lock the session and wait for the user to unlock it.
    #[default]
    Lock,
    /// Notification only; the break ends immediately.
    None,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            break_interval_secs: 20 * 60,
            tick_interval_secs: 60,
            notification: NotificationConfig::default(),
            label_template: "{minutes}".into(),
            status_file: None,
            display: DisplayMode::default(),
            display_cmd: None,
            foreground_cmd: None,
            start_enabled: true,
            log_dir: None,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let BreakNotice { title, body } = BreakNotice::default();
        Self { title, body }
    }
}

impl From<&NotificationConfig> for BreakNotice {
    fn from(n: &NotificationConfig) -> Self {
        BreakNotice {
            title: n.title.clone(),
            body: n.body.clone(),
        }
    }
}

impl ClientConfig {
    /// Resolve the config path and load it. A missing file at the XDG default
    /// location yields the built-in defaults; a missing explicit path is an error.
    pub fn find_and_load(cli_value: Option<PathBuf>) -> Result<(PathBuf, Self), AppError> {
        let (path, explicit) = resolve_config_path(cli_value)?;
        if !explicit && !path.exists() {
            return Ok((path, Self::default()));
        }
        let cfg = load_config(&path)?;
        Ok((path, cfg))
    }

    pub fn apply_overrides(&mut self, break_mins: Option<u64>, tick_secs: Option<u64>) {
        if let Some(m) = break_mins {
            self.break_interval_secs = m.saturating_mul(60);
        }
        if let Some(s) = tick_secs {
            self.tick_interval_secs = s;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for (name, secs) in [
            ("break_interval_secs", self.break_interval_secs),
            ("tick_interval_secs", self.tick_interval_secs),
        ] {
            if secs == 0 {
                return Err(AppError::Config(format!("{name} must be positive")));
            }
            if secs > MAX_INTERVAL_SECS {
                return Err(AppError::Config(format!(
                    "{name} must be at most {MAX_INTERVAL_SECS} (one week)"
                )));
            }
        }
        for (name, cmd) in [
            ("display_cmd", &self.display_cmd),
            ("foreground_cmd", &self.foreground_cmd),
        ] {
            if matches!(cmd, Some(argv) if argv.is_empty()) {
                return Err(AppError::Config(format!("{name} must not be empty")));
            }
        }
        crate::platform::status::LabelTemplate::new(&self.label_template)?;
        Ok(())
    }

    pub fn break_interval(&self) -> Duration {
        Duration::from_secs(self.break_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Returns the path and whether it was named explicitly (flag or environment).
pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<(PathBuf, bool), AppError> {
    if let Some(p) = cli_value {
        return Ok((p, true));
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok((PathBuf::from(p), true));
    }
    let p = default_config_path()
        .ok_or_else(|| AppError::Config("could not determine config dir".into()))?;
    Ok((p, false))
}

pub fn default_config_path() -> Option<PathBuf> {
    let pd = ProjectDirs::from("dev", "eyebreak", "eyebreak")?;
    Some(pd.config_dir().join("client.yaml"))
}

pub fn load_config(path: &Path) -> Result<ClientConfig, AppError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {} failed: {e}", path.display())))?;
    let cfg: ClientConfig = serde_yaml::from_str(&data)
        .map_err(|e| AppError::Config(format!("parse {} failed: {e}", path.display())))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &ClientConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let data = to_yaml(cfg)?;
    std::fs::write(path, data)
        .map_err(|e| AppError::Config(format!("write {} failed: {e}", path.display())))
}

pub fn to_yaml(cfg: &ClientConfig) -> Result<String, AppError> {
    serde_yaml::to_string(cfg).map_err(|e| AppError::Config(format!("serialize config failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        std::fs::write(
            &path,
            "break_interval_secs: 1500\ndisplay: none\nnotification:\n  title: Rest\n",
        )
        .unwrap();

        let (found, cfg) = ClientConfig::find_and_load(Some(path.clone())).unwrap();
        assert_eq!(found, path);
        assert_eq!(cfg.break_interval_secs, 1500);
        assert_eq!(cfg.tick_interval_secs, 60);
        assert_eq!(cfg.display, DisplayMode::None);
        assert_eq!(cfg.notification.title, "Rest");
        assert_eq!(cfg.notification.body, BreakNotice::default().body);
        assert!(cfg.start_enabled);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::find_and_load(Some(dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        std::fs::write(&path, "break_interval_secs: [1, 2]\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn save_then_load_preserves_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("client.yaml");
        let cfg = ClientConfig {
            display_cmd: Some(vec!["swaylock".into(), "-f".into()]),
            foreground_cmd: Some(vec!["focused-app".into()]),
            ..ClientConfig::default()
        };
        save_config(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[test]
    fn overrides_and_validation() {
        let mut cfg = ClientConfig::default();
        cfg.apply_overrides(Some(25), None);
        assert_eq!(cfg.break_interval(), Duration::from_secs(25 * 60));
        assert!(cfg.validate().is_ok());

        cfg.apply_overrides(None, Some(0));
        assert!(cfg.validate().is_err());

        let cfg = ClientConfig {
            break_interval_secs: 0,
            ..ClientConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ClientConfig {
            display_cmd: Some(vec![]),
            ..ClientConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ClientConfig {
            label_template: "{minutes".into(),
            ..ClientConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_intervals_beyond_a_week() {
        let mut cfg = ClientConfig::default();
        cfg.apply_overrides(Some(u64::MAX), None);
        assert_eq!(cfg.break_interval_secs, u64::MAX);
        assert!(cfg.validate().is_err());

        cfg.apply_overrides(Some(MAX_INTERVAL_SECS / 60), None);
        assert!(cfg.validate().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        std::fs::write(&path, "break_interval_secs: 18446744073709551615\n").unwrap();
        let cfg = load_config(&path).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("break_interval_secs"));

        let cfg = ClientConfig {
            tick_interval_secs: MAX_INTERVAL_SECS + 1,
            ..ClientConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
