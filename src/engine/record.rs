// src/engine/record.rs

//! Codec for the kernel's variable-length event records.
//!
//! Layout per record, native endian:
//!
//! ```text
//! wd: i32 | mask: u32 | cookie: u32 | len: u32 | name: [u8; len]
//! ```
//!
//! `name` is NUL-terminated and padded with further NULs; `len` is zero for
//! events about the watched object itself.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};

use crate::errors::{Result, WatchtreeError};
use crate::types::{EventMask, WatchHandle};

/// Size of the fixed record header.
pub const HEADER_SIZE: usize = 16;

/// Longest name a single record can carry (`NAME_MAX` + terminator).
pub const MAX_NAME_SIZE: usize = 256;

/// One decoded event, exactly as the kernel reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub handle: WatchHandle,
    pub mask: EventMask,
    pub cookie: u32,
    pub name: Option<OsString>,
}

impl Event {
    pub fn is(&self, kind: EventMask) -> bool {
        self.mask.intersects(kind)
    }

    pub fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }
}

/// Decode every record in `buf`.
///
/// The kernel only ever returns whole records, so trailing bytes that do not
/// form a complete record are reported as an error.
pub fn decode(buf: &[u8]) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let rest = &buf[offset..];
        if rest.len() < HEADER_SIZE {
            return Err(WatchtreeError::MalformedRecord {
                offset,
                reason: format!("{} trailing bytes, header needs {HEADER_SIZE}", rest.len()),
            });
        }

        let wd = i32::from_ne_bytes(word(rest, 0));
        let mask = u32::from_ne_bytes(word(rest, 4));
        let cookie = u32::from_ne_bytes(word(rest, 8));
        let len = u32::from_ne_bytes(word(rest, 12)) as usize;

        let Some(raw_name) = rest.get(HEADER_SIZE..HEADER_SIZE + len) else {
            return Err(WatchtreeError::MalformedRecord {
                offset,
                reason: format!(
                    "name length {len} exceeds remaining {} bytes",
                    rest.len() - HEADER_SIZE
                ),
            });
        };

        let name_end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        let name = if name_end == 0 {
            None
        } else {
            Some(OsString::from_vec(raw_name[..name_end].to_vec()))
        };

        events.push(Event {
            handle: WatchHandle::new(wd),
            mask: EventMask::from_bits_retain(mask),
            cookie,
            name,
        });
        offset += HEADER_SIZE + len;
    }

    Ok(events)
}

/// Encode one event the way the kernel lays it out, padding the name to a
/// multiple of the header alignment.
pub fn encode(event: &Event, out: &mut Vec<u8>) {
    let name = event.name.as_deref().map(OsStr::as_bytes).unwrap_or_default();
    let len = if name.is_empty() {
        0
    } else {
        (name.len() + 1).next_multiple_of(HEADER_SIZE)
    };

    out.extend_from_slice(&event.handle.raw().to_ne_bytes());
    out.extend_from_slice(&event.mask.bits().to_ne_bytes());
    out.extend_from_slice(&event.cookie.to_ne_bytes());
    out.extend_from_slice(&(len as u32).to_ne_bytes());
    out.extend_from_slice(name);
    out.resize(out.len() + (len - name.len()), 0);
}

/// Encoded size of `event`.
pub fn encoded_len(event: &Event) -> usize {
    let mut buf = Vec::new();
    encode(event, &mut buf);
    buf.len()
}

fn word(buf: &[u8], at: usize) -> [u8; 4] {
    [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
}
