// src/watch/tree.rs

//! Arena of watch nodes keyed by handle.
//!
//! Parent links are single handles and child links are handle sets, so the
//! structure never owns anything through a pointer. Inserting requires the
//! parent to exist already, which keeps it a forest.

use std::collections::{BTreeSet, HashMap};
use std::ffi::{OsStr, OsString};

use tracing::trace;

use crate::types::{EventMask, WatchHandle};

/// One actively watched filesystem object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchNode {
    handle: WatchHandle,
    /// `None` marks a top-level root.
    parent: Option<WatchHandle>,
    event_mask: EventMask,
    /// Leaf name; for roots, the path as the caller gave it.
    name: OsString,
    is_dir: bool,
    children: BTreeSet<WatchHandle>,
}

impl WatchNode {
    pub fn new(
        handle: WatchHandle,
        parent: Option<WatchHandle>,
        event_mask: EventMask,
        name: impl Into<OsString>,
        is_dir: bool,
    ) -> Self {
        Self {
            handle,
            parent,
            event_mask,
            name: name.into(),
            is_dir,
            children: BTreeSet::new(),
        }
    }

    pub fn handle(&self) -> WatchHandle {
        self.handle
    }

    pub fn parent(&self) -> Option<WatchHandle> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn event_mask(&self) -> EventMask {
        self.event_mask
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn children(&self) -> &BTreeSet<WatchHandle> {
        &self.children
    }
}

#[derive(Debug, Default)]
pub struct WatchTree {
    nodes: HashMap<WatchHandle, WatchNode>,
}

impl WatchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` and link it under its parent.
    ///
    /// Fails when the handle is already present or the parent is unknown.
    pub fn insert(&mut self, node: WatchNode) -> bool {
        if self.nodes.contains_key(&node.handle) {
            return false;
        }
        if let Some(parent) = node.parent {
            let Some(parent_node) = self.nodes.get_mut(&parent) else {
                return false;
            };
            parent_node.children.insert(node.handle);
        }

        trace!(handle = %node.handle, parent = ?node.parent, name = ?node.name, "tree insert");
        self.nodes.insert(node.handle, node);
        true
    }

    pub fn lookup(&self, handle: WatchHandle) -> Option<&WatchNode> {
        self.nodes.get(&handle)
    }

    pub fn contains(&self, handle: WatchHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    /// Unlink `handle` from its parent and evict it together with every
    /// descendant. Returns the evicted nodes, `handle` first; empty when the
    /// handle is unknown.
    pub fn remove(&mut self, handle: WatchHandle) -> Vec<WatchNode> {
        let Some(node) = self.nodes.remove(&handle) else {
            return Vec::new();
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.remove(&handle);
        }

        let mut pending: Vec<WatchHandle> = node.children.iter().copied().collect();
        let mut removed = vec![node];
        while let Some(child) = pending.pop() {
            if let Some(child_node) = self.nodes.remove(&child) {
                pending.extend(child_node.children.iter().copied());
                removed.push(child_node);
            }
        }

        trace!(%handle, evicted = removed.len(), "tree remove");
        removed
    }

    /// Move `handle` under `new_parent` as `new_name`. The handle itself is
    /// unchanged.
    ///
    /// Fails when either node is unknown, when the target is not a directory,
    /// or when the target lies inside the moved subtree.
    pub fn relocate(
        &mut self,
        handle: WatchHandle,
        new_parent: WatchHandle,
        new_name: impl Into<OsString>,
    ) -> bool {
        let Some(old_parent) = self.nodes.get(&handle).map(|n| n.parent) else {
            return false;
        };
        match self.nodes.get(&new_parent) {
            Some(target) if target.is_dir => {}
            _ => return false,
        }
        if self.is_within(new_parent, handle) {
            return false;
        }

        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            old.children.remove(&handle);
        }
        if let Some(target) = self.nodes.get_mut(&new_parent) {
            target.children.insert(handle);
        }
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.parent = Some(new_parent);
            node.name = new_name.into();
        }
        true
    }

    /// Child of `parent` whose leaf name is exactly `name`.
    pub fn child_named(&self, parent: WatchHandle, name: &OsStr) -> Option<WatchHandle> {
        let parent = self.nodes.get(&parent)?;
        parent
            .children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child).is_some_and(|n| n.name == name))
    }

    /// Update the mask recorded for an existing node.
    pub fn set_event_mask(&mut self, handle: WatchHandle, mask: EventMask) -> bool {
        match self.nodes.get_mut(&handle) {
            Some(node) => {
                node.event_mask = mask;
                true
            }
            None => false,
        }
    }

    pub fn handles(&self) -> impl Iterator<Item = WatchHandle> + '_ {
        self.nodes.keys().copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = &WatchNode> + '_ {
        self.nodes.values().filter(|n| n.is_root())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node, returning the handles that were present.
    pub fn clear(&mut self) -> Vec<WatchHandle> {
        let handles: Vec<WatchHandle> = self.nodes.keys().copied().collect();
        self.nodes.clear();
        handles
    }

    /// Check that parent links and child sets agree everywhere.
    pub fn is_consistent(&self) -> bool {
        let parents_ok = self.nodes.values().all(|node| match node.parent {
            None => true,
            Some(parent) => self
                .nodes
                .get(&parent)
                .is_some_and(|p| p.children.contains(&node.handle)),
        });
        let children_ok = self.nodes.values().all(|node| {
            node.children.iter().all(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|c| c.parent == Some(node.handle))
            })
        });
        parents_ok && children_ok
    }

    /// Whether `handle` is `ancestor` or sits below it.
    fn is_within(&self, handle: WatchHandle, ancestor: WatchHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.nodes.get(&h).and_then(|n| n.parent);
        }
        false
    }
}
