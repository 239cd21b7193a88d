use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Scene-wide settings: initial colors and load behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background_color: Color,
    pub line_color: Color,
    /// Keep a destroyed, empty layer in the registry when its load fails.
    pub retain_failed_layers: bool,
    pub query_timeout_secs: u64,
    /// Directory holding `<place>.json` grid documents.
    pub grid_dir: Option<PathBuf>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background_color: Color::from_rgb_u32(0xF7F2E8),
            line_color: Color::from_rgba8(26, 26, 26, 0.7),
            retain_failed_layers: false,
            query_timeout_secs: 30,
            grid_dir: None,
        }
    }
}

impl SceneConfig {
    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn default_line_color(&self) -> Color {
        self.line_color
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
