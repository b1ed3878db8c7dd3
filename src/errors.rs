// src/errors.rs

//! Crate-wide error type and result alias.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchtreeError {
    #[error("event loop is not initialized")]
    NotInitialized,

    #[error("{op} failed for {path:?}: {source}")]
    Facility {
        op: &'static str,
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    #[error("cannot classify {path:?}: {source}")]
    Classify {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot list directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("watch tree inconsistency: {0}")]
    TreeInconsistent(String),

    #[error("malformed event record at byte {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchtreeError {
    /// OS error code carried by this error, if it came from a syscall.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            WatchtreeError::Facility { source, .. }
            | WatchtreeError::Classify { source, .. }
            | WatchtreeError::ReadDir { source, .. }
            | WatchtreeError::IoError(source) => source.raw_os_error(),
            WatchtreeError::NotADirectory(_) => Some(libc::ENOTDIR),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchtreeError>;
