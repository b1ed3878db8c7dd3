// src/watch/mod.rs

//! Watch bookkeeping.
//!
//! This module is responsible for:
//! - The handle → node tree (`tree.rs`) and path reconstruction (`path.rs`).
//! - Registering single watches and whole subtrees (`installer.rs`).
//! - Releasing watches so a handle never outlives its tree entry.
//!
//! It does **not** read events; the engine drives it from decoded records.

pub mod installer;
pub mod path;
pub mod tree;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{Result, WatchtreeError};
use crate::facility::Facility;
use crate::fs::{EntryKind, FileSystem};
use crate::types::{EventMask, WatchHandle};

pub use tree::{WatchNode, WatchTree};

/// The tree together with everything needed to change it: the facility that
/// owns the watches, the filesystem used to classify paths, the recursive-mode
/// flag, and the last recorded OS error.
#[derive(Debug)]
pub struct WatchRegistry<F: Facility> {
    facility: F,
    fs: Arc<dyn FileSystem>,
    tree: WatchTree,
    recursive: bool,
    last_error: Option<i32>,
}

impl<F: Facility> WatchRegistry<F> {
    pub fn new(facility: F, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            facility,
            fs,
            tree: WatchTree::new(),
            recursive: false,
            last_error: None,
        }
    }

    pub fn tree(&self) -> &WatchTree {
        &self.tree
    }

    pub fn facility(&self) -> &F {
        &self.facility
    }

    pub fn facility_mut(&mut self) -> &mut F {
        &mut self.facility
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn last_error(&self) -> Option<i32> {
        self.last_error
    }

    pub(crate) fn record_error(&mut self, err: &WatchtreeError) {
        if let Some(code) = err.os_code() {
            self.last_error = Some(code);
        }
    }

    /// Probe `path` and report whether it is a directory. Anything that is
    /// not a real directory (including a symlink to one) counts as a file.
    pub fn classify(&mut self, path: &Path) -> Result<bool> {
        match self.fs.classify(path) {
            Ok(kind) => Ok(kind == EntryKind::Directory),
            Err(source) => {
                let err = WatchtreeError::Classify {
                    path: path.to_path_buf(),
                    source,
                };
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Watch a single top-level path, without descending into it.
    ///
    /// Watching an already-tracked object refreshes its mask and returns the
    /// existing handle.
    pub fn add_watch(&mut self, path: &Path, mask: EventMask) -> Result<WatchHandle> {
        let handle = self.facility_add(path, mask)?;
        if self.tree.set_event_mask(handle, mask) {
            debug!(%handle, ?path, "path already watched; mask refreshed");
            return Ok(handle);
        }

        let is_dir = match self.classify(path) {
            Ok(is_dir) => is_dir,
            Err(err) => {
                // the watch exists but cannot be described; do not leak it
                self.release(handle);
                return Err(err);
            }
        };

        let node = WatchNode::new(handle, None, mask, path.as_os_str(), is_dir);
        if !self.tree.insert(node) {
            return Err(WatchtreeError::TreeInconsistent(format!(
                "could not insert root {handle} for {path:?}"
            )));
        }
        debug!(%handle, ?path, is_dir, "added watch");
        Ok(handle)
    }

    /// Evict `handle` and its descendants from the tree and release their
    /// watches. Unknown handles are ignored.
    pub fn remove(&mut self, handle: WatchHandle) {
        for node in self.tree.remove(handle) {
            self.release(node.handle());
        }
    }

    /// Evict `handle` and its descendants after the kernel already dropped
    /// the watch for `handle` itself.
    pub fn forget(&mut self, handle: WatchHandle) {
        for node in self.tree.remove(handle) {
            if node.handle() != handle {
                self.release(node.handle());
            }
        }
    }

    /// Release every watch and leave recursive mode.
    pub fn clear(&mut self) {
        for handle in self.tree.clear() {
            self.release(handle);
        }
        self.recursive = false;
    }

    pub(crate) fn set_recursive(&mut self) {
        self.recursive = true;
    }

    pub(crate) fn tree_mut(&mut self) -> &mut WatchTree {
        &mut self.tree
    }

    pub(crate) fn facility_add(&mut self, path: &Path, mask: EventMask) -> Result<WatchHandle> {
        self.facility.add_watch(path, mask).map_err(|source| {
            let err = WatchtreeError::Facility {
                op: "add_watch",
                path: Some(path.to_path_buf()),
                source,
            };
            self.record_error(&err);
            err
        })
    }

    fn release(&mut self, handle: WatchHandle) {
        match self.facility.remove_watch(handle) {
            Ok(()) => debug!(%handle, "released watch"),
            // already gone on the kernel side (deleted object, oneshot, ...)
            Err(err) if err.raw_os_error() == Some(libc::EINVAL) => {
                debug!(%handle, "watch already released by the kernel");
            }
            Err(source) => {
                warn!(%handle, error = %source, "failed to release watch");
                self.record_error(&WatchtreeError::Facility {
                    op: "remove_watch",
                    path: None,
                    source,
                });
            }
        }
    }
}
