use std::path::PathBuf;

use eyebreak_core::StatusSurface;
use serde::Serialize;
use tinytemplate::TinyTemplate;
use tracing::{debug, warn};

use crate::AppError;

/// Remaining-time label written to a file so status bars (waybar, polybar, i3blocks) can show it.
#[derive(Debug, Clone)]
pub struct FileStatus {
    path: Option<PathBuf>,
}

impl FileStatus {
    /// `None` keeps the label in the log only.
    pub fn new(path: Option<PathBuf>) -> Self {
        if let Some(p) = &path
            && let Some(parent) = p.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(error=%e, path=%parent.display(), "cannot create status directory");
        }
        Self { path }
    }
}

impl StatusSurface for FileStatus {
    fn set_label(&self, text: &str) {
        debug!(label = text, "status label");
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = std::fs::write(path, format!("{text}\n")) {
            warn!(error=%e, path=%path.display(), "failed to write status label");
        }
    }
}

#[derive(Serialize)]
struct LabelCtx {
    minutes: i64,
}

/// Renders the remaining-minutes label from a TinyTemplate source such as `"{minutes} min"`.
#[derive(Debug, Clone)]
pub struct LabelTemplate {
    source: String,
}

impl LabelTemplate {
    /// Compiles and test-renders `source` so errors surface at startup.
    pub fn new(source: &str) -> Result<Self, AppError> {
        let t = Self {
            source: source.to_string(),
        };
        t.try_render(0)?;
        Ok(t)
    }

    pub fn render(&self, minutes: i64) -> String {
        self.try_render(minutes).unwrap_or_else(|e| {
            warn!(error=%e, "label template failed; using plain minutes");
            minutes.to_string()
        })
    }

    fn try_render(&self, minutes: i64) -> Result<String, AppError> {
        let mut tt = TinyTemplate::new();
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        tt.add_template("label", &self.source)
            .map_err(|e| AppError::Config(format!("label template error: {e}")))?;
        tt.render("label", &LabelCtx { minutes })
            .map_err(|e| AppError::Config(format!("label render error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_minutes() {
        let t = LabelTemplate::new("{minutes}").unwrap();
        assert_eq!(t.render(20), "20");
        assert_eq!(t.render(-1), "-1");

        let t = LabelTemplate::new("☀ {minutes}m").unwrap();
        assert_eq!(t.render(7), "☀ 7m");
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(LabelTemplate::new("{seconds}").is_err());
    }

    #[test]
    fn writes_label_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eyebreak").join("label");
        let status = FileStatus::new(Some(path.clone()));
        status.set_label("12");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "12\n");
        status.set_label("");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\n");
    }

    #[test]
    fn log_only_status_is_silent() {
        let status = FileStatus::new(None);
        status.set_label("5");
        status.set_label("");
    }
}
