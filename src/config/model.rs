// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::event_loop::{EventLoopOptions, DEFAULT_BUFFER_SIZE};
use crate::types::{EventMask, RenameCorrelation};

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// paths = ["/srv/data"]
/// recursive = true
/// events = ["create", "delete", "move", "delete_self"]
///
/// [reader]
/// buffer_size = 8192
/// batch_capacity = 64
/// rename_correlation = "positional"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub reader: ReaderSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Paths to watch. Command-line paths replace this list.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Install watches over whole subtrees and follow changes below them.
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Event kind names, see [`EventMask::from_config_name`].
    #[serde(default = "default_events")]
    pub events: Vec<String>,
}

fn default_recursive() -> bool {
    true
}

fn default_events() -> Vec<String> {
    vec!["all".to_string()]
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            recursive: default_recursive(),
            events: default_events(),
        }
    }
}

/// `[reader]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderSection {
    /// Bytes requested from the kernel per read.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Maximum records handed out per batch.
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    #[serde(default)]
    pub rename_correlation: RenameCorrelation,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_batch_capacity() -> usize {
    64
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            batch_capacity: default_batch_capacity(),
            rename_correlation: RenameCorrelation::default(),
        }
    }
}

/// Validated configuration. Built from [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub reader: ReaderSection,
    event_mask: EventMask,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        watch: WatchSection,
        reader: ReaderSection,
        event_mask: EventMask,
    ) -> Self {
        Self {
            watch,
            reader,
            event_mask,
        }
    }

    /// Union of the configured event kinds.
    pub fn event_mask(&self) -> EventMask {
        self.event_mask
    }

    pub fn loop_options(&self) -> EventLoopOptions {
        EventLoopOptions {
            buffer_size: self.reader.buffer_size,
            rename_correlation: self.reader.rename_correlation,
        }
    }
}
