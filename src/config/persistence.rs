use crate::error::{GiffsError, Result};
use std::path::Path;

use crate::config::paths::*;
use crate::config::schema::*;

const MAX_TTL_SECS: u64 = 3600;

/// Load the user configuration. A missing file means defaults.
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        tracing::debug!(
            "No config file at {}, using defaults",
            config_path.display()
        );
        return Ok(Config::default());
    }

    let toml_content = std::fs::read_to_string(config_path)
        .map_err(|e| GiffsError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&toml_content)?;
    tracing::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

pub fn parse_config(toml_content: &str) -> Result<Config> {
    let config: Config = toml::from_str(toml_content)
        .map_err(|e| GiffsError::Config(format!("Failed to parse config: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    let ttl = config.fuse.get_ttl_secs();
    if ttl > MAX_TTL_SECS {
        return Err(GiffsError::Config(format!(
            "fuse.ttl_secs must be at most {} (got {})",
            MAX_TTL_SECS, ttl
        )));
    }

    let fsname = config.fuse.get_fsname();
    if fsname.is_empty() {
        return Err(GiffsError::Config(
            "fuse.fsname cannot be empty".to_string(),
        ));
    }
    if fsname.contains(',') || fsname.chars().any(char::is_whitespace) {
        return Err(GiffsError::Config(format!(
            "fuse.fsname '{}' cannot contain commas or whitespace",
            fsname
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.fuse.get_ttl_secs(), 1);
        assert_eq!(config.fuse.get_fsname(), "giffs");
        assert!(config.fuse.get_auto_unmount());
    }

    #[test]
    fn test_fuse_section_overrides_defaults() {
        let config = parse_config(
            r#"
[fuse]
ttl_secs = 5
fsname = "pictures"
auto_unmount = false
"#,
        )
        .unwrap();
        assert_eq!(config.fuse.get_ttl_secs(), 5);
        assert_eq!(config.fuse.get_fsname(), "pictures");
        assert!(!config.fuse.get_auto_unmount());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse_config("[fuse]\nttl_secs = 99999\n").is_err());
        assert!(parse_config("[fuse]\nfsname = \"\"\n").is_err());
        assert!(parse_config("[fuse]\nfsname = \"a,b\"\n").is_err());
        assert!(parse_config("[fuse]\nttl_secs = \"soon\"\n").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.fuse.get_ttl_secs(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[fuse]\nttl_secs = 0\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.fuse.get_ttl_secs(), 0);
    }
}
