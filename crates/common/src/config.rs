//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where exported clips are written.
    pub exports_dir: PathBuf,

    /// Editor and compositor settings.
    pub editor: EditorDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Editor, compositor, and export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// Drawing surface width in pixels.
    pub surface_width: u32,

    /// Drawing surface height in pixels.
    pub surface_height: u32,

    /// Render loop refresh rate (Hz).
    pub refresh_hz: u32,

    /// Frame rate at which the export pipeline samples the surface.
    pub capture_fps: u32,

    /// Export length used when the primary asset has no duration (stills).
    pub fallback_export_secs: f64,

    /// Audio graph sample rate.
    pub audio_sample_rate: u32,

    /// Bold font used for the text and subtitle layers.
    /// When unset, well-known system locations are searched.
    pub font_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lumacut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exports_dir: default_exports_dir(),
            editor: EditorDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            surface_width: 1280,
            surface_height: 720,
            refresh_hz: 60,
            capture_fps: 30,
            fallback_export_secs: 10.0,
            audio_sample_rate: 48000,
            font_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => return config.sanitized(),
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Replace zero rates and sizes, which would stall the render loop or
    /// the export sampler, with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = EditorDefaults::default();
        let editor = &mut self.editor;
        if editor.surface_width == 0 || editor.surface_height == 0 {
            editor.surface_width = defaults.surface_width;
            editor.surface_height = defaults.surface_height;
        }
        if editor.refresh_hz == 0 {
            editor.refresh_hz = defaults.refresh_hz;
        }
        if editor.capture_fps == 0 {
            editor.capture_fps = defaults.capture_fps;
        }
        if !(editor.fallback_export_secs > 0.0) {
            editor.fallback_export_secs = defaults.fallback_export_secs;
        }
        if editor.audio_sample_rate == 0 {
            editor.audio_sample_rate = defaults.audio_sample_rate;
        }
        self
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("lumacut").join("config.json")
}

/// Default exports directory.
fn default_exports_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("lumacut").join("exports")
}
