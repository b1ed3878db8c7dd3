// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate event
/// names or reader limits. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the raw config the binary should start from.
///
/// An explicitly requested file must exist. Without one, the default path is
/// used when present and built-in defaults otherwise.
pub fn load_or_default(explicit: Option<&Path>) -> Result<RawConfigFile> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    let path = default_config_path();
    if path.is_file() {
        debug!(?path, "loading default config file");
        load_from_path(&path)
    } else {
        debug!(?path, "no config file; using defaults");
        Ok(RawConfigFile::default())
    }
}

/// `Watchtree.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Watchtree.toml")
}
