// src/watch/path.rs

//! Path reconstruction from a watch handle.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::types::WatchHandle;
use crate::watch::tree::WatchTree;

const SEPARATOR: &str = "/";

impl WatchTree {
    /// Full path of `handle`, built from the names along its parent chain.
    ///
    /// Directories get a trailing separator, files do not. Returns `None` if
    /// the handle or any of its ancestors is missing.
    pub fn resolve_path(&self, handle: WatchHandle) -> Option<PathBuf> {
        let is_dir = self.lookup(handle)?.is_dir();

        let mut segments: Vec<&OsStr> = Vec::new();
        let mut current = Some(handle);
        while let Some(h) = current {
            let node = self.lookup(h)?;
            segments.push(node.name());
            current = node.parent();
        }

        let mut path = OsString::new();
        while let Some(segment) = segments.pop() {
            path.push(segment);
            let more = !segments.is_empty();
            if (more || is_dir) && !ends_with_separator(&path) {
                path.push(SEPARATOR);
            }
        }
        Some(PathBuf::from(path))
    }
}

fn ends_with_separator(path: &OsStr) -> bool {
    path.as_bytes().last() == Some(&b'/')
}
