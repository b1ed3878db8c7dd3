// src/engine/demux.rs

//! Event demultiplexing and rename correlation.
//!
//! The kernel reports a rename as a "moved-from" on the source directory and
//! a "moved-to" on the destination. The demultiplexer keeps at most one
//! half-seen rename in [`PendingRename`] and resolves it on the very next
//! record:
//!
//! - a "moved-to" (with a matching cookie, in cookie mode) relocates the node;
//! - anything else means the object left the watched scope, so its watch is
//!   removed.
//!
//! Two unrelated renames interleaved in one batch therefore misclassify the
//! first as a removal in positional mode.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::engine::record::Event;
use crate::facility::Facility;
use crate::types::{EventMask, RenameCorrelation};
use crate::watch::{WatchNode, WatchRegistry};

/// First half of a rename: the node that was moved away, as it looked when the
/// "moved-from" arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRename {
    pub node: WatchNode,
    /// Sequence number of the "moved-from" record.
    pub seen_at: u64,
    pub cookie: u32,
}

#[derive(Debug, Default)]
pub struct Demultiplexer {
    correlation: RenameCorrelation,
    pending: Option<PendingRename>,
    seq: u64,
}

impl Demultiplexer {
    pub fn new(correlation: RenameCorrelation) -> Self {
        Self {
            correlation,
            pending: None,
            seq: 0,
        }
    }

    pub fn pending(&self) -> Option<&PendingRename> {
        self.pending.as_ref()
    }

    /// Number of records processed so far.
    pub fn processed(&self) -> u64 {
        self.seq
    }

    /// Forget any half-seen rename without touching the tree.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Update the registry for one record. The record itself is left
    /// untouched; the caller always passes it on.
    pub fn process<F: Facility>(&mut self, event: &Event, registry: &mut WatchRegistry<F>) {
        self.seq += 1;
        let moved_to = event.is(EventMask::MOVED_TO);

        if !moved_to {
            if let Some(pending) = self.pending.take() {
                debug!(
                    handle = %pending.node.handle(),
                    name = ?pending.node.name(),
                    "rename not completed; treating as moved out of scope"
                );
                registry.remove(pending.node.handle());
            }
        } else if self.correlation == RenameCorrelation::Cookie {
            if let Some(pending) = self.pending.take_if(|p| p.cookie != event.cookie) {
                debug!(
                    handle = %pending.node.handle(),
                    expected = pending.cookie,
                    got = event.cookie,
                    "rename cookie mismatch; treating as moved out of scope"
                );
                registry.remove(pending.node.handle());
            }
        }

        if event.is(EventMask::DELETE_SELF) {
            debug!(handle = %event.handle, "watched object deleted");
            registry.remove(event.handle);
        }

        if event.is(EventMask::IGNORED) && registry.tree().contains(event.handle) {
            debug!(handle = %event.handle, "watch dropped by the kernel");
            registry.forget(event.handle);
        }

        if event.is(EventMask::Q_OVERFLOW) {
            warn!("event queue overflowed; watch tree may be stale");
        }

        if !registry.is_recursive() {
            return;
        }

        if event.is(EventMask::CREATE) || (moved_to && self.pending.is_none()) {
            self.install_arrival(event, registry);
        } else if event.is(EventMask::MOVED_FROM) {
            self.open_rename(event, registry);
        } else if moved_to {
            self.complete_rename(event, registry);
        }
    }

    /// Watch an object that appeared in a tracked directory, descending into
    /// it when it is a directory.
    fn install_arrival<F: Facility>(&self, event: &Event, registry: &mut WatchRegistry<F>) {
        let Some(name) = event.name() else {
            return;
        };
        let (is_dir, mask) = match registry.tree().lookup(event.handle) {
            Some(node) => (node.is_dir(), node.event_mask()),
            None => return,
        };
        if !is_dir {
            return;
        }
        let Some(dir_path) = registry.tree().resolve_path(event.handle) else {
            trace!(handle = %event.handle, "cannot resolve directory of new entry");
            return;
        };

        let mut full = OsString::from(dir_path);
        full.push(name);
        let path = PathBuf::from(full);

        let installed = match registry.classify(&path) {
            Ok(true) => registry.install_subtree(Some(event.handle), &path, name, mask),
            Ok(false) => registry.install_leaf(event.handle, &path, name, mask),
            Err(err) => Err(err),
        };
        match installed {
            Ok(handle) => debug!(%handle, ?path, "watching new entry"),
            Err(err) => warn!(?path, error = %err, "could not watch new entry"),
        }
    }

    fn open_rename<F: Facility>(&mut self, event: &Event, registry: &WatchRegistry<F>) {
        let Some(name) = event.name() else {
            return;
        };
        let tree = registry.tree();
        let Some(node) = tree
            .child_named(event.handle, name)
            .and_then(|child| tree.lookup(child))
        else {
            trace!(dir = %event.handle, ?name, "moved-from for an untracked entry");
            return;
        };

        trace!(handle = %node.handle(), cookie = event.cookie, "rename pending");
        self.pending = Some(PendingRename {
            node: node.clone(),
            seen_at: self.seq,
            cookie: event.cookie,
        });
    }

    fn complete_rename<F: Facility>(&mut self, event: &Event, registry: &mut WatchRegistry<F>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let handle = pending.node.handle();

        let relocated = event
            .name()
            .is_some_and(|name| registry.tree_mut().relocate(handle, event.handle, name));
        if relocated {
            debug!(
                %handle,
                from = ?pending.node.name(),
                to = ?event.name(),
                dir = %event.handle,
                "rename correlated"
            );
        } else {
            debug!(%handle, "rename target not tracked; treating as moved out of scope");
            registry.remove(handle);
        }
    }
}
