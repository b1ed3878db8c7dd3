// src/facility/mod.rs

//! The kernel notification facility, behind a trait.
//!
//! Production code talks to inotify through [`inotify::Inotify`]; tests use
//! [`mock::MockFacility`], which hands out handles and serves scripted event
//! records without touching the kernel.

use std::fmt::Debug;
use std::io;
use std::os::fd::RawFd;
use std::path::Path;

use crate::types::{EventMask, WatchHandle};

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod inotify;
pub mod mock;

/// The three inotify primitives plus the descriptor plumbing the event loop
/// needs. Every failure carries the OS error code.
pub trait Facility: Debug {
    /// Acquire the descriptor. Calling it again once open is a no-op.
    fn open(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;

    /// Register `path`. Watching an object that is already watched returns
    /// the existing handle.
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle>;

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()>;

    /// Block until at least one complete record is available, then fill
    /// `buf` with as many whole records as fit.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Bytes currently queued on the descriptor.
    fn bytes_available(&self) -> io::Result<usize>;

    /// The pollable descriptor, once open.
    fn descriptor(&self) -> Option<RawFd>;
}

pub(crate) fn not_open() -> io::Error {
    io::Error::from_raw_os_error(libc::EBADF)
}
