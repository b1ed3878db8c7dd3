#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use watchtree::engine::{EventLoop, EventLoopOptions};
use watchtree::facility::mock::MockFacility;
use watchtree::fs::mock::MockFileSystem;

/// A real directory tree under a temporary directory, removed on drop.
pub struct FixtureTree {
    dir: TempDir,
}

impl FixtureTree {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Create `rel` as a directory, with any missing parents.
    pub fn dir(self, rel: &str) -> Result<Self> {
        fs::create_dir_all(self.path(rel))?;
        Ok(self)
    }

    /// Create `rel` as a small file, with any missing parents.
    pub fn file(self, rel: &str) -> Result<Self> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, rel.as_bytes())?;
        Ok(self)
    }
}

/// Builder for an event loop over the mock facility and filesystem.
///
/// The returned mocks share state with the loop, so a test can script
/// records and filesystem changes after construction.
pub struct MockLoopBuilder {
    fs: MockFileSystem,
    facility: MockFacility,
    options: EventLoopOptions,
}

impl MockLoopBuilder {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            facility: MockFacility::new(),
            options: EventLoopOptions::default(),
        }
    }

    pub fn with_file(self, path: &str) -> Self {
        self.fs.add_file(path);
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.fs.add_dir(path);
        self
    }

    pub fn with_options(mut self, options: EventLoopOptions) -> Self {
        self.options = options;
        self
    }

    /// Build and initialize the loop.
    pub fn build(self) -> (EventLoop<MockFacility>, MockFacility, MockFileSystem) {
        let mut ev = EventLoop::with_parts(
            self.facility.clone(),
            Arc::new(self.fs.clone()),
            self.options,
        );
        ev.init().expect("mock facility failed to open");
        (ev, self.facility, self.fs)
    }
}

impl Default for MockLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
