// src/facility/mock.rs

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ffi::OsString;
use std::io;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{not_open, Facility};
use crate::engine::record::{encode, Event};
use crate::types::{EventMask, WatchHandle};

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    fail_open: Option<i32>,
    next_handle: i32,
    watches: BTreeMap<WatchHandle, (PathBuf, EventMask)>,
    by_path: HashMap<PathBuf, WatchHandle>,
    failures: HashMap<PathBuf, i32>,
    removed: Vec<WatchHandle>,
    queue: VecDeque<Vec<u8>>,
}

/// Scripted stand-in for inotify.
///
/// Handles are assigned sequentially starting at 1. Queued records are served
/// whole, as many as fit per read, like the kernel does. Reading an empty
/// queue fails with `WouldBlock` instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct MockFacility {
    state: Arc<Mutex<MockState>>,
}

/// Descriptor number reported once the mock is open.
pub const MOCK_DESCRIPTOR: RawFd = 1000;

impl MockFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail with `errno`.
    pub fn fail_open(&self, errno: i32) {
        self.state.lock().unwrap().fail_open = Some(errno);
    }

    /// Make `add_watch` on `path` fail with `errno`.
    pub fn fail_add_watch(&self, path: impl AsRef<Path>, errno: i32) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.as_ref().to_path_buf(), errno);
    }

    /// Queue one event record.
    pub fn push_event(&self, handle: WatchHandle, mask: EventMask, cookie: u32, name: Option<&str>) {
        let event = Event {
            handle,
            mask,
            cookie,
            name: name.map(OsString::from),
        };
        let mut bytes = Vec::new();
        encode(&event, &mut bytes);
        self.state.lock().unwrap().queue.push_back(bytes);
    }

    pub fn handle_for(&self, path: impl AsRef<Path>) -> Option<WatchHandle> {
        self.state.lock().unwrap().by_path.get(path.as_ref()).copied()
    }

    pub fn is_watched(&self, handle: WatchHandle) -> bool {
        self.state.lock().unwrap().watches.contains_key(&handle)
    }

    pub fn watch_count(&self) -> usize {
        self.state.lock().unwrap().watches.len()
    }

    /// Handles passed to `remove_watch`, in call order.
    pub fn removed(&self) -> Vec<WatchHandle> {
        self.state.lock().unwrap().removed.clone()
    }

    pub fn queued(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }
}

impl Facility for MockFacility {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(errno) = state.fail_open.take() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        if !state.open {
            state.open = true;
            state.next_handle = 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(not_open());
        }
        if let Some(errno) = state.failures.get(path) {
            return Err(io::Error::from_raw_os_error(*errno));
        }
        if let Some(handle) = state.by_path.get(path).copied() {
            state.watches.insert(handle, (path.to_path_buf(), mask));
            return Ok(handle);
        }

        let handle = WatchHandle::new(state.next_handle);
        state.next_handle += 1;
        state.watches.insert(handle, (path.to_path_buf(), mask));
        state.by_path.insert(path.to_path_buf(), handle);
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(not_open());
        }
        let Some((path, _)) = state.watches.remove(&handle) else {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        };
        state.by_path.remove(&path);
        state.removed.push(handle);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(not_open());
        }
        let Some(first) = state.queue.front() else {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        };
        if first.len() > buf.len() {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        let mut written = 0;
        while let Some(record) = state.queue.front() {
            if written + record.len() > buf.len() {
                break;
            }
            buf[written..written + record.len()].copy_from_slice(record);
            written += record.len();
            state.queue.pop_front();
        }
        Ok(written)
    }

    fn bytes_available(&self) -> io::Result<usize> {
        let state = self.state.lock().unwrap();
        Ok(state.queue.iter().map(Vec::len).sum())
    }

    fn descriptor(&self) -> Option<RawFd> {
        self.is_open().then_some(MOCK_DESCRIPTOR)
    }
}
