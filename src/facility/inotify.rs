// src/facility/inotify.rs

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::{debug, trace};

use super::{not_open, Facility};
use crate::types::{EventMask, WatchHandle};

/// inotify instance backed by raw libc calls.
///
/// The descriptor is opened in blocking mode; [`Facility::read`] still polls
/// for readiness first so interrupted waits can be resumed.
#[derive(Debug, Default)]
pub struct Inotify {
    fd: Option<OwnedFd>,
}

impl Inotify {
    pub fn new() -> Self {
        Self::default()
    }

    fn raw(&self) -> io::Result<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd()).ok_or_else(not_open)
    }
}

impl Facility for Inotify {
    fn open(&mut self) -> io::Result<()> {
        if self.fd.is_some() {
            return Ok(());
        }

        // SAFETY: no pointers are passed; the flags are valid for inotify_init1.
        let fd = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `fd` was just returned by the kernel and is owned by nobody else.
        self.fd = Some(unsafe { OwnedFd::from_raw_fd(fd) });
        debug!(fd, "opened inotify descriptor");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle> {
        let fd = self.raw()?;
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        // SAFETY: `c_path` is NUL-terminated and outlives the call.
        let wd = unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), mask.bits()) };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }
        trace!(wd, ?path, "inotify_add_watch");
        Ok(WatchHandle::new(wd))
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        let fd = self.raw()?;
        // SAFETY: plain integer arguments; a stale handle only yields EINVAL.
        if unsafe { libc::inotify_rm_watch(fd, handle.raw()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        trace!(wd = handle.raw(), "inotify_rm_watch");
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let fd = self.raw()?;
        loop {
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            // SAFETY: `pfd` is a single valid pollfd for the duration of the call.
            if unsafe { libc::poll(&mut pfd, 1, -1) } < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            // SAFETY: the kernel writes at most `buf.len()` bytes into `buf`.
            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => continue,
                    _ => return Err(err),
                }
            }
            return Ok(n as usize);
        }
    }

    fn bytes_available(&self) -> io::Result<usize> {
        let fd = self.raw()?;
        let mut queued: libc::c_int = 0;
        // SAFETY: FIONREAD writes one c_int through the pointer, which is valid.
        if unsafe { libc::ioctl(fd, libc::FIONREAD, &mut queued as *mut libc::c_int) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(queued.max(0) as usize)
    }

    fn descriptor(&self) -> Option<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd())
    }
}
