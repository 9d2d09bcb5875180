//! Player settings
//!
//! Stored as XML in the user's config directory. Missing fields fall back to
//! their defaults so older files keep loading.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::video::BufferMode;

/// Settings for the video bridge player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "VideoBridgeSettings")]
pub struct PlayerSettings {
    /// Single or double frame buffering
    #[serde(rename = "bufferMode", default)]
    pub buffer_mode: BufferMode,

    /// Initial volume in percent (0-100)
    #[serde(rename = "volume", default = "default_volume")]
    pub volume: i32,

    #[serde(rename = "muted", default)]
    pub muted: bool,

    /// Start playing as soon as the media is loaded
    #[serde(rename = "autoplay", default = "default_true")]
    pub autoplay: bool,

    /// Preserve aspect ratio when drawing into the window
    #[serde(rename = "letterbox", default = "default_true")]
    pub letterbox: bool,

    #[serde(rename = "windowWidth", default = "default_window_width")]
    pub window_width: u32,

    #[serde(rename = "windowHeight", default = "default_window_height")]
    pub window_height: u32,

    /// Log level filter, e.g. "info" or "video_bridge=debug"
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,

    /// Optional log file path
    #[serde(rename = "logFile", default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

fn default_volume() -> i32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            buffer_mode: BufferMode::default(),
            volume: default_volume(),
            muted: false,
            autoplay: true,
            letterbox: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl PlayerSettings {
    /// `<config_dir>/VideoBridge/settings.xml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("VideoBridge");
            p.push("settings.xml");
            p
        })
    }

    /// Clamp values into their valid ranges
    pub fn sanitize(&mut self) {
        self.volume = self.volume.clamp(0, 100);
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        if self.log_level.trim().is_empty() {
            self.log_level = default_log_level();
        }
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = from_str(&contents)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save settings to an XML file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let xml = to_string(self)?;

        // Add XML declaration
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted)?;
        Ok(())
    }

    /// Load from `path` (or the default location); defaults if missing or unreadable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Settings-related errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
}
