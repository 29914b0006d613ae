use crate::error::{GiffsError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(config_dir) = std::env::var("GIFFS_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    ProjectDirs::from("", "", "giffs")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            GiffsError::Config("Could not determine the configuration directory".to_string())
        })
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}
