// src/fs/mock.rs

use super::{DirEntryInfo, EntryKind, FileSystem};
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Symlink,
    Dir(Vec<OsString>), // List of child names
}

/// In-memory directory tree. Clones share the same state, so a test can keep
/// one handle and mutate the tree while the event loop holds another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.add_entry(path.as_ref(), MockEntry::File);
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>) {
        self.add_entry(path.as_ref(), MockEntry::Symlink);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.entries.lock().unwrap();
        ensure_dir_entry(&mut entries, path.as_ref());
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|p, _| !p.starts_with(path));
        unlink_from_parent(&mut entries, path);
    }

    /// Move `from` (and its subtree) to `to`.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) {
        let (from, to) = (from.as_ref(), to.as_ref());
        let mut entries = self.entries.lock().unwrap();

        let moved: Vec<(PathBuf, MockEntry)> = entries
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect();
        if moved.is_empty() {
            return;
        }

        entries.retain(|p, _| !p.starts_with(from));
        unlink_from_parent(&mut entries, from);

        for (path, entry) in moved {
            let Ok(rest) = path.strip_prefix(from) else {
                continue;
            };
            let target = if rest.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(rest)
            };
            entries.insert(target, entry);
        }
        link_into_parent(&mut entries, to);
    }

    fn add_entry(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(path.to_path_buf(), entry);
        link_into_parent(&mut entries, path);
    }
}

// Ensure parent directories exist implicitly for simplicity in this mock
fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_into_parent(entries, path);
}

fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return;
    };
    ensure_dir_entry(entries, parent);
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_os_string());
        }
    }
}

fn unlink_from_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return;
    };
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        children.retain(|c| c != name);
    }
}

fn not_found(path: &Path) -> io::Error {
    tracing::trace!(?path, "mock entry missing");
    io::Error::from_raw_os_error(libc::ENOENT)
}

impl FileSystem for MockFileSystem {
    fn classify(&self, path: &Path) -> io::Result<EntryKind> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File) => Ok(EntryKind::File),
            Some(MockEntry::Symlink) => Ok(EntryKind::Other),
            Some(MockEntry::Dir(_)) => Ok(EntryKind::Directory),
            None => Err(not_found(path)),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let entries = self.entries.lock().unwrap();
        let Some(MockEntry::Dir(children)) = entries.get(path) else {
            return Err(not_found(path));
        };

        let mut listing = Vec::with_capacity(children.len());
        for name in children {
            let kind = match entries.get(&path.join(name)) {
                Some(MockEntry::File) => EntryKind::File,
                Some(MockEntry::Dir(_)) => EntryKind::Directory,
                _ => EntryKind::Other,
            };
            listing.push(DirEntryInfo {
                name: name.clone(),
                kind,
            });
        }
        Ok(listing)
    }
}
