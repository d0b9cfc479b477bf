//! Saved form state and named presets.
//!
//! Both are plain JSON on disk. Loading is deliberately forgiving: a
//! missing or malformed file degrades to defaults with a warning so the
//! interactive flow is never interrupted by a bad state file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::FillError;
use crate::payload::Payload;

/// Everything the form restores between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub payload: Payload,
    pub auto_open: bool,
    pub last_generated_path: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    pub removed_topics: Vec<String>,
}

impl AppState {
    /// Default location for the state file.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bep-designer")
            .join("state.json")
    }

    /// Load state, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(err) => {
                    warn!(path = %path.display(), %err, "malformed state file, using defaults");
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable state file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), FillError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "saved state");
        Ok(())
    }
}

/// Path of a named preset inside a preset directory.
pub fn preset_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.preset.json", crate::fill::sanitize_name(name)))
}

/// Save the current state as a named preset.
pub fn save_preset(dir: &Path, name: &str, state: &AppState) -> Result<PathBuf, FillError> {
    let path = preset_path(dir, name);
    state.save(&path)?;
    Ok(path)
}

/// Load a named preset, with the same forgiving semantics as state.
pub fn load_preset(dir: &Path, name: &str) -> AppState {
    AppState::load(&preset_path(dir, name))
}
