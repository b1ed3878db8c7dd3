// src/watch/installer.rs

//! Subtree installation.
//!
//! The walk is iterative: directories waiting to be expanded sit on an
//! explicit stack together with their already-known handle, so depth is
//! bounded by memory rather than by the call stack.
//!
//! The first failure aborts the walk. Watches installed before it stay in
//! place; callers that need all-or-nothing call `clear` themselves.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::errors::{Result, WatchtreeError};
use crate::facility::Facility;
use crate::fs::EntryKind;
use crate::types::{EventMask, WatchHandle};
use crate::watch::tree::WatchNode;
use crate::watch::WatchRegistry;

/// Outcome of registering one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registered {
    New(WatchHandle),
    /// The facility handed back a handle that is already in the tree.
    Existing(WatchHandle),
}

impl Registered {
    fn handle(self) -> WatchHandle {
        match self {
            Registered::New(h) | Registered::Existing(h) => h,
        }
    }
}

impl<F: Facility> WatchRegistry<F> {
    /// Watch the directory `path` and everything below it, then switch the
    /// registry into recursive mode.
    pub fn add_watch_recursively(&mut self, path: &Path, mask: EventMask) -> Result<WatchHandle> {
        if !self.classify(path)? {
            let err = WatchtreeError::NotADirectory(path.to_path_buf());
            self.record_error(&err);
            return Err(err);
        }

        let root = self.install_subtree(None, path, path.as_os_str(), mask)?;
        info!(%root, ?path, watches = self.tree().len(), "recursive watch installed");
        Ok(root)
    }

    /// Watch a single file below an existing directory node.
    pub(crate) fn install_leaf(
        &mut self,
        parent: WatchHandle,
        path: &Path,
        name: &OsStr,
        mask: EventMask,
    ) -> Result<WatchHandle> {
        self.register(Some(parent), path, name, mask, false)
            .map(Registered::handle)
    }

    /// Watch directory `path` as `name` under `parent` (or as a new root when
    /// `parent` is `None`) and walk its subtree depth-first.
    pub(crate) fn install_subtree(
        &mut self,
        parent: Option<WatchHandle>,
        path: &Path,
        name: &OsStr,
        mask: EventMask,
    ) -> Result<WatchHandle> {
        let fs = Arc::clone(&self.fs);
        let root = self.register(parent, path, name, mask, true)?.handle();

        let mut pending: Vec<(PathBuf, WatchHandle)> = vec![(path.to_path_buf(), root)];
        while let Some((dir, dir_handle)) = pending.pop() {
            let mut entries = fs.read_dir(&dir).map_err(|source| {
                let err = WatchtreeError::ReadDir {
                    path: dir.clone(),
                    source,
                };
                self.record_error(&err);
                err
            })?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            debug!(?dir, entries = entries.len(), "expanding directory");

            for entry in entries {
                if entry.name == "." || entry.name == ".." {
                    continue;
                }
                let child_path = dir.join(&entry.name);
                match entry.kind {
                    EntryKind::File => {
                        self.register(Some(dir_handle), &child_path, &entry.name, mask, false)?;
                    }
                    EntryKind::Directory => {
                        match self.register(Some(dir_handle), &child_path, &entry.name, mask, true)? {
                            Registered::New(handle) => pending.push((child_path, handle)),
                            Registered::Existing(handle) => {
                                trace!(%handle, ?child_path, "directory already installed");
                            }
                        }
                    }
                    EntryKind::Other => trace!(?child_path, "skipping special entry"),
                }
            }
        }

        self.set_recursive();
        Ok(root)
    }

    fn register(
        &mut self,
        parent: Option<WatchHandle>,
        path: &Path,
        name: &OsStr,
        mask: EventMask,
        is_dir: bool,
    ) -> Result<Registered> {
        let handle = self.facility_add(path, mask)?;
        // the kernel replaced the old mask on the existing watch
        if self.tree_mut().set_event_mask(handle, mask) {
            return Ok(Registered::Existing(handle));
        }

        let node = WatchNode::new(handle, parent, mask, name, is_dir);
        if !self.tree_mut().insert(node) {
            return Err(WatchtreeError::TreeInconsistent(format!(
                "parent {parent:?} of {path:?} is not in the tree"
            )));
        }
        trace!(%handle, ?path, is_dir, "registered watch");
        Ok(Registered::New(handle))
    }
}
