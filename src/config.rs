// Application settings, stored as JSON in the platform config directory:
// - Linux:   ~/.config/dmview/config.json
// - macOS:   ~/Library/Application Support/dmview/config.json
// - Windows: %APPDATA%\dmview\config\config.json

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metadata::{DEFAULT_TILE_PIXELS, DEFAULT_TILE_SIZE_MM};
use crate::scale::DisplayGeometry;
use crate::types::Size;

pub const CONFIG_FILE: &str = "config.json";
pub const MIN_BRUSH: u32 = 5;
pub const MAX_BRUSH: u32 = 100;
pub const DEFAULT_BRUSH: u32 = 30;

/// A display the player window can be opened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayProfile {
    pub name: String,
    #[serde(flatten)]
    pub geometry: DisplayGeometry,
    /// Desktop position of the display's top-left corner.
    #[serde(default)]
    pub x: isize,
    #[serde(default)]
    pub y: isize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub last_session_path: Option<PathBuf>,
    pub sessions_dir: Option<PathBuf>,
    pub default_tile_pixels: u32,
    pub default_tile_size_mm: f64,
    pub brush_size: u32,
    pub player_monitor: Option<usize>,
    pub displays: Vec<DisplayProfile>,
    pub dm_window: Size,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_session_path: None,
            sessions_dir: None,
            default_tile_pixels: DEFAULT_TILE_PIXELS,
            default_tile_size_mm: DEFAULT_TILE_SIZE_MM,
            brush_size: DEFAULT_BRUSH,
            player_monitor: None,
            displays: Vec::new(),
            dm_window: Size::new(1200, 800),
        }
    }
}

/// Directory holding `config.json`, falling back to `./dmview` without a home dir.
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "dmview")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./dmview"))
}

/// Default parent directory for new sessions.
pub fn default_sessions_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "dmview")
        .map(|dirs| dirs.data_dir().join("sessions"))
        .unwrap_or_else(|| PathBuf::from("./sessions"))
}

impl Config {
    /// Load from the platform location; any problem yields defaults.
    pub fn load() -> Self {
        Self::load_from(&config_dir().join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<Config>(&text) {
            Ok(mut cfg) => {
                cfg.set_brush_size(cfg.brush_size);
                cfg
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_dir().join(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH, MAX_BRUSH);
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.sessions_dir.clone().unwrap_or_else(default_sessions_dir)
    }

    /// The display selected for the player window.
    pub fn player_display(&self) -> Result<&DisplayProfile> {
        let index = self
            .player_monitor
            .ok_or_else(|| Error::config("no player monitor selected (use --player-monitor)"))?;
        self.displays.get(index).ok_or_else(|| {
            Error::config(format!(
                "player monitor {index} is not configured ({} displays known)",
                self.displays.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabletop() -> DisplayProfile {
        DisplayProfile {
            name: "Table TV".into(),
            geometry: DisplayGeometry { width_px: 1920, height_px: 1080, width_mm: 520.0, height_mm: 290.0 },
            x: 1920,
            y: 0,
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join(CONFIG_FILE));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.brush_size, 30);
        assert_eq!(cfg.default_tile_pixels, 70);
        assert_eq!(cfg.dm_window, Size::new(1200, 800));
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn save_then_load_keeps_displays_and_clamps_brush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut cfg = Config { player_monitor: Some(0), displays: vec![tabletop()], ..Config::default() };
        cfg.brush_size = 500;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.displays, vec![tabletop()]);
        assert_eq!(loaded.brush_size, MAX_BRUSH);
        assert_eq!(loaded.player_display().unwrap().name, "Table TV");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "brush_size": 1 }"#).unwrap();
        let cfg = Config::load_from(&path);
        assert_eq!(cfg.brush_size, MIN_BRUSH);
        assert_eq!(cfg.default_tile_size_mm, DEFAULT_TILE_SIZE_MM);
    }

    #[test]
    fn player_display_errors_are_configuration_errors() {
        let cfg = Config::default();
        assert!(matches!(cfg.player_display(), Err(Error::Configuration(_))));
        let cfg = Config { player_monitor: Some(3), displays: vec![tabletop()], ..Config::default() };
        assert!(matches!(cfg.player_display(), Err(Error::Configuration(_))));
    }
}
