use std::io;
use std::path::Path;

use gridscene_core::SceneConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

fn validate(config: &SceneConfig) -> Result<(), ConfigError> {
    if config.query_timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "query_timeout_secs",
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Read a scene config file. Missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<SceneConfig, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    let config = SceneConfig::from_json(&json)?;
    validate(&config)?;
    log::debug!("loaded scene config from {}", path.display());
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to the defaults.
pub fn load_config_or_default(path: &Path) -> Result<SceneConfig, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        log::info!("no config at {}, using defaults", path.display());
        Ok(SceneConfig::default())
    }
}

pub fn save_config(path: &Path, config: &SceneConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, config.to_json()?)?;
    Ok(())
}
