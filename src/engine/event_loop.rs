// src/engine/event_loop.rs

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::engine::demux::{Demultiplexer, PendingRename};
use crate::engine::record::{self, Event, HEADER_SIZE, MAX_NAME_SIZE};
use crate::errors::{Result, WatchtreeError};
use crate::facility::Facility;
use crate::fs::FileSystem;
use crate::types::{EventMask, RenameCorrelation, WatchHandle};
use crate::watch::{WatchRegistry, WatchTree};

/// Default size of the read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Smallest buffer that can hold one maximal record.
pub const MIN_BUFFER_SIZE: usize = HEADER_SIZE + MAX_NAME_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Ready,
    /// The last operation recorded a failure. Further calls are still allowed.
    Error,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Uninitialized => "uninitialized",
            LoopState::Ready => "ready",
            LoopState::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLoopOptions {
    /// Bytes requested from the facility per read. Raised to
    /// [`MIN_BUFFER_SIZE`] if smaller.
    pub buffer_size: usize,
    pub rename_correlation: RenameCorrelation,
}

impl Default for EventLoopOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            rename_correlation: RenameCorrelation::default(),
        }
    }
}

/// Owns the facility descriptor, the read buffer, the watch registry and the
/// demultiplexer.
///
/// Records are decoded one buffer at a time into an internal backlog and run
/// through the demultiplexer as they are handed out, so the tree always
/// reflects exactly the records the caller has seen.
pub struct EventLoop<F: Facility> {
    registry: WatchRegistry<F>,
    demux: Demultiplexer,
    options: EventLoopOptions,
    buffer: Vec<u8>,
    backlog: VecDeque<Event>,
    state: LoopState,
}

impl<F: Facility> fmt::Debug for EventLoop<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("state", &self.state)
            .field("watches", &self.registry.tree().len())
            .field("recursive", &self.registry.is_recursive())
            .field("buffered", &self.backlog.len())
            .finish_non_exhaustive()
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl EventLoop<crate::facility::inotify::Inotify> {
    /// An event loop over the real inotify facility and filesystem.
    pub fn new(options: EventLoopOptions) -> Self {
        Self::with_parts(
            crate::facility::inotify::Inotify::new(),
            Arc::new(crate::fs::RealFileSystem),
            options,
        )
    }
}

impl<F: Facility> EventLoop<F> {
    pub fn with_parts(facility: F, fs: Arc<dyn FileSystem>, options: EventLoopOptions) -> Self {
        let buffer_size = options.buffer_size.max(MIN_BUFFER_SIZE);
        Self {
            registry: WatchRegistry::new(facility, fs),
            demux: Demultiplexer::new(options.rename_correlation),
            options: EventLoopOptions {
                buffer_size,
                ..options
            },
            buffer: vec![0; buffer_size],
            backlog: VecDeque::new(),
            state: LoopState::Uninitialized,
        }
    }

    /// Acquire the facility descriptor. Calling it on an initialized loop is a
    /// no-op.
    pub fn init(&mut self) -> Result<()> {
        if self.registry.facility().is_open() {
            return Ok(());
        }

        if let Err(source) = self.registry.facility_mut().open() {
            let err = WatchtreeError::Facility {
                op: "init",
                path: None,
                source,
            };
            self.registry.record_error(&err);
            return Err(err);
        }

        self.state = LoopState::Ready;
        info!(
            descriptor = ?self.descriptor(),
            buffer_size = self.options.buffer_size,
            correlation = ?self.options.rename_correlation,
            "event loop initialized"
        );
        Ok(())
    }

    /// Watch one path, without descending into it.
    pub fn add_watch(&mut self, path: impl AsRef<Path>, mask: EventMask) -> Result<WatchHandle> {
        self.ensure_ready()?;
        let result = self.registry.add_watch(path.as_ref(), mask);
        self.settle(result)
    }

    /// Watch each path in order, stopping at the first failure. Watches added
    /// before the failure stay in place.
    pub fn add_watch_many<I, P>(&mut self, paths: I, mask: EventMask) -> Result<Vec<WatchHandle>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_ready()?;
        let mut handles = Vec::new();
        for path in paths {
            let result = self.registry.add_watch(path.as_ref(), mask);
            handles.push(self.settle(result)?);
        }
        Ok(handles)
    }

    /// Watch the directory `path`, every file and directory below it, and
    /// whatever appears there later.
    pub fn add_watch_recursively(
        &mut self,
        path: impl AsRef<Path>,
        mask: EventMask,
    ) -> Result<WatchHandle> {
        self.ensure_ready()?;
        let result = self.registry.add_watch_recursively(path.as_ref(), mask);
        self.settle(result)
    }

    /// Stop watching `handle` and everything below it. Returns `false` if the
    /// handle was not tracked.
    pub fn remove_watch(&mut self, handle: WatchHandle) -> Result<bool> {
        self.ensure_ready()?;
        if !self.registry.tree().contains(handle) {
            return Ok(false);
        }
        self.registry.remove(handle);
        debug!(%handle, "watch removed on request");
        Ok(true)
    }

    /// Return up to `capacity` records, blocking until at least one is
    /// available.
    ///
    /// Each returned record has already been applied to the watch tree.
    /// Records decoded beyond `capacity` are kept for the next call, which
    /// serves them before reading the descriptor again.
    pub fn read_events(&mut self, capacity: usize) -> Result<Vec<Event>> {
        self.ensure_ready()?;
        if capacity == 0 {
            return Ok(Vec::new());
        }
        if self.backlog.is_empty() {
            self.fill_backlog()?;
        }

        let take = capacity.min(self.backlog.len());
        let mut batch = Vec::with_capacity(take);
        for event in self.backlog.drain(..take) {
            self.demux.process(&event, &mut self.registry);
            batch.push(event);
        }
        self.state = LoopState::Ready;
        trace!(
            delivered = batch.len(),
            buffered = self.backlog.len(),
            "event batch ready"
        );
        Ok(batch)
    }

    /// Release every watch and leave recursive mode. The descriptor stays
    /// open.
    pub fn clear_all(&mut self) {
        let released = self.registry.tree().len();
        self.registry.clear();
        self.demux.reset();
        debug!(released, "cleared all watches");
    }

    /// Last OS error code recorded by any operation. Not reset by later
    /// successes.
    pub fn last_error(&self) -> Option<i32> {
        self.registry.last_error()
    }

    pub fn resolve_path(&self, handle: WatchHandle) -> Option<PathBuf> {
        self.registry.tree().resolve_path(handle)
    }

    pub fn descriptor(&self) -> Option<std::os::fd::RawFd> {
        self.registry.facility().descriptor()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn options(&self) -> &EventLoopOptions {
        &self.options
    }

    pub fn tree(&self) -> &WatchTree {
        self.registry.tree()
    }

    pub fn is_recursive(&self) -> bool {
        self.registry.is_recursive()
    }

    pub fn pending_rename(&self) -> Option<&PendingRename> {
        self.demux.pending()
    }

    /// Records decoded but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.backlog.len()
    }

    /// Bytes queued on the descriptor and not yet read.
    pub fn bytes_available(&self) -> Result<usize> {
        self.ensure_ready()?;
        self.registry
            .facility()
            .bytes_available()
            .map_err(|source| WatchtreeError::Facility {
                op: "bytes_available",
                path: None,
                source,
            })
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            LoopState::Uninitialized => Err(WatchtreeError::NotInitialized),
            LoopState::Ready | LoopState::Error => Ok(()),
        }
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        self.state = match result {
            Ok(_) => LoopState::Ready,
            Err(_) => LoopState::Error,
        };
        result
    }

    fn fill_backlog(&mut self) -> Result<()> {
        let read = match self.registry.facility_mut().read(&mut self.buffer) {
            Ok(n) => n,
            Err(source) => {
                let err = WatchtreeError::Facility {
                    op: "read",
                    path: None,
                    source,
                };
                self.registry.record_error(&err);
                return self.settle(Err(err));
            }
        };

        let events = match record::decode(&self.buffer[..read]) {
            Ok(events) => events,
            Err(err) => return self.settle(Err(err)),
        };
        trace!(bytes = read, records = events.len(), "read event records");
        self.backlog.extend(events);
        Ok(())
    }
}
