// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, ReaderSection, WatchSection};
use crate::engine::event_loop::MIN_BUFFER_SIZE;
use crate::errors::{Result, WatchtreeError};
use crate::types::EventMask;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchtreeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let mask = validate_events(&raw.watch)?;
        validate_reader(&raw.reader)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.reader, mask))
    }
}

impl ConfigFile {
    /// Fail unless at least one path is configured.
    pub fn require_paths(&self) -> Result<()> {
        if self.watch.paths.is_empty() {
            return Err(WatchtreeError::ConfigError(
                "no paths to watch: pass PATHS or set [watch].paths".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_events(watch: &WatchSection) -> Result<EventMask> {
    let mut mask = EventMask::empty();
    for name in &watch.events {
        let kind = EventMask::from_config_name(name).ok_or_else(|| {
            WatchtreeError::ConfigError(format!("[watch].events: unknown event kind '{name}'"))
        })?;
        mask |= kind;
    }

    if !mask.intersects(EventMask::ALL_EVENTS) {
        return Err(WatchtreeError::ConfigError(
            "[watch].events must name at least one event kind".to_string(),
        ));
    }
    Ok(mask)
}

fn validate_reader(reader: &ReaderSection) -> Result<()> {
    if reader.buffer_size < MIN_BUFFER_SIZE {
        return Err(WatchtreeError::ConfigError(format!(
            "[reader].buffer_size must be >= {MIN_BUFFER_SIZE} (got {})",
            reader.buffer_size
        )));
    }

    if reader.batch_capacity == 0 {
        return Err(WatchtreeError::ConfigError(
            "[reader].batch_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
