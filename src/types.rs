use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::Deserialize;

/// Opaque watch identifier handed out by the notification facility.
///
/// The kernel may reuse a handle once its watch is gone, so a handle only
/// identifies a node while that node is present in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchHandle(i32);

impl WatchHandle {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Event kinds and watch flags, bit-compatible with `<sys/inotify.h>`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// File was accessed.
        const ACCESS = 0x0000_0001;
        /// File was modified.
        const MODIFY = 0x0000_0002;
        /// Metadata changed.
        const ATTRIB = 0x0000_0004;
        /// Writable file was closed.
        const CLOSE_WRITE = 0x0000_0008;
        /// Non-writable file was closed.
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File was opened.
        const OPEN = 0x0000_0020;
        /// Entry was moved out of the watched directory.
        const MOVED_FROM = 0x0000_0040;
        /// Entry was moved into the watched directory.
        const MOVED_TO = 0x0000_0080;
        /// Entry was created in the watched directory.
        const CREATE = 0x0000_0100;
        /// Entry was deleted from the watched directory.
        const DELETE = 0x0000_0200;
        /// The watched object itself was deleted.
        const DELETE_SELF = 0x0000_0400;
        /// The watched object itself was moved.
        const MOVE_SELF = 0x0000_0800;

        /// Backing filesystem was unmounted.
        const UNMOUNT = 0x0000_2000;
        /// Event queue overflowed.
        const Q_OVERFLOW = 0x0000_4000;
        /// Watch was removed, explicitly or by the kernel.
        const IGNORED = 0x0000_8000;

        const ONLYDIR = 0x0100_0000;
        const DONT_FOLLOW = 0x0200_0000;
        const EXCL_UNLINK = 0x0400_0000;
        const MASK_ADD = 0x2000_0000;
        /// Set on events whose subject is a directory.
        const ISDIR = 0x4000_0000;
        const ONESHOT = 0x8000_0000;

        const CLOSE = Self::CLOSE_WRITE.bits() | Self::CLOSE_NOWRITE.bits();
        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
        const ALL_EVENTS = Self::ACCESS.bits()
            | Self::MODIFY.bits()
            | Self::ATTRIB.bits()
            | Self::CLOSE_WRITE.bits()
            | Self::CLOSE_NOWRITE.bits()
            | Self::OPEN.bits()
            | Self::MOVED_FROM.bits()
            | Self::MOVED_TO.bits()
            | Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::DELETE_SELF.bits()
            | Self::MOVE_SELF.bits();
    }
}

impl EventMask {
    /// Look up a mask by the lowercase name used in config files and on the
    /// command line (`"create"`, `"moved_from"`, `"all"`, ...).
    pub fn from_config_name(name: &str) -> Option<Self> {
        let mask = match name.trim().to_lowercase().as_str() {
            "access" => Self::ACCESS,
            "modify" => Self::MODIFY,
            "attrib" => Self::ATTRIB,
            "close_write" => Self::CLOSE_WRITE,
            "close_nowrite" => Self::CLOSE_NOWRITE,
            "open" => Self::OPEN,
            "moved_from" => Self::MOVED_FROM,
            "moved_to" => Self::MOVED_TO,
            "create" => Self::CREATE,
            "delete" => Self::DELETE,
            "delete_self" => Self::DELETE_SELF,
            "move_self" => Self::MOVE_SELF,
            "close" => Self::CLOSE,
            "move" => Self::MOVE,
            "all" => Self::ALL_EVENTS,
            "onlydir" => Self::ONLYDIR,
            "dont_follow" => Self::DONT_FOLLOW,
            "excl_unlink" => Self::EXCL_UNLINK,
            _ => return None,
        };
        Some(mask)
    }

    /// Names of the single event kinds set in this mask, in bit order.
    pub fn kind_names(self) -> Vec<&'static str> {
        const KINDS: [(EventMask, &str); 16] = [
            (EventMask::ACCESS, "access"),
            (EventMask::MODIFY, "modify"),
            (EventMask::ATTRIB, "attrib"),
            (EventMask::CLOSE_WRITE, "close_write"),
            (EventMask::CLOSE_NOWRITE, "close_nowrite"),
            (EventMask::OPEN, "open"),
            (EventMask::MOVED_FROM, "moved_from"),
            (EventMask::MOVED_TO, "moved_to"),
            (EventMask::CREATE, "create"),
            (EventMask::DELETE, "delete"),
            (EventMask::DELETE_SELF, "delete_self"),
            (EventMask::MOVE_SELF, "move_self"),
            (EventMask::UNMOUNT, "unmount"),
            (EventMask::Q_OVERFLOW, "q_overflow"),
            (EventMask::IGNORED, "ignored"),
            (EventMask::ISDIR, "isdir"),
        ];

        KINDS
            .iter()
            .filter(|(kind, _)| self.contains(*kind))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl FromStr for EventMask {
    type Err = String;

    /// Parse a comma-separated list of event names, e.g. `"create,delete"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = EventMask::empty();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let kind = EventMask::from_config_name(part)
                .ok_or_else(|| format!("unknown event kind: {}", part.trim()))?;
            mask |= kind;
        }
        if mask.is_empty() {
            return Err("event list is empty".to_string());
        }
        Ok(mask)
    }
}

/// How a "moved-to" record is matched with the preceding "moved-from".
///
/// - `Positional`: the next record after a "moved-from" completes the rename
///   if it is a "moved-to". Two renames interleaved in one batch misclassify
///   the first as a removal.
/// - `Cookie`: the "moved-to" must also carry the same rename cookie as the
///   pending "moved-from"; otherwise the pending node is evicted and the
///   "moved-to" is treated as a new arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameCorrelation {
    #[default]
    Positional,
    Cookie,
}

impl FromStr for RenameCorrelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positional" => Ok(RenameCorrelation::Positional),
            "cookie" => Ok(RenameCorrelation::Cookie),
            other => Err(format!(
                "invalid rename_correlation: {other} (expected \"positional\" or \"cookie\")"
            )),
        }
    }
}
