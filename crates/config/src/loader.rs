use std::path::{Path, PathBuf};

use crate::{BirdhouseConfig, Error, Result};

const CONFIG_FILE_NAME: &str = "birdhouse.toml";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "BIRDHOUSE_CONFIG";

/// Find the config file to load.
///
/// Order: explicit path, `BIRDHOUSE_CONFIG`, `./birdhouse.toml`, then
/// `<config dir>/birdhouse/birdhouse.toml`. An explicit path is returned even
/// when it does not exist so the caller reports it.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    directories::ProjectDirs::from("", "", "birdhouse")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

/// Load configuration, falling back to defaults when no file is found.
pub fn load_config(explicit: Option<&Path>) -> Result<BirdhouseConfig> {
    match discover_config_path(explicit) {
        Some(path) => load_config_file(&path),
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(BirdhouseConfig::default())
        },
    }
}

/// Parse a specific TOML config file.
pub fn load_config_file(path: &Path) -> Result<BirdhouseConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: BirdhouseConfig = toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
