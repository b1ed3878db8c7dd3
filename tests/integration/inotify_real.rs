// tests/integration/inotify_real.rs

use std::ffi::{OsStr, OsString};
use std::fs;

use watchtree::engine::{Event, EventLoop, EventLoopOptions, LoopState};
use watchtree::facility::inotify::Inotify;
use watchtree::types::{EventMask, WatchHandle};
use watchtree_test_utils::builders::FixtureTree;
use watchtree_test_utils::init_tracing;

const MASK: EventMask = EventMask::CREATE
    .union(EventMask::DELETE)
    .union(EventMask::MOVE)
    .union(EventMask::DELETE_SELF)
    .union(EventMask::MOVE_SELF);

fn ready_loop() -> EventLoop<Inotify> {
    init_tracing();
    let mut ev = EventLoop::new(EventLoopOptions::default());
    ev.init().unwrap();
    ev
}

fn read_until(ev: &mut EventLoop<Inotify>, mut done: impl FnMut(&Event) -> bool) -> Vec<Event> {
    let mut seen = Vec::new();
    for _ in 0..64 {
        for event in ev.read_events(16).unwrap() {
            let stop = done(&event);
            seen.push(event);
            if stop {
                return seen;
            }
        }
    }
    panic!("expected event not seen; got {seen:?}");
}

fn handle_at(ev: &EventLoop<Inotify>, path: &str) -> WatchHandle {
    ev.tree()
        .handles()
        .find(|h| ev.resolve_path(*h).is_some_and(|p| p.as_os_str() == path))
        .unwrap_or_else(|| panic!("no watch resolves to {path}"))
}

fn resolved(ev: &EventLoop<Inotify>, handle: WatchHandle) -> OsString {
    ev.resolve_path(handle).unwrap().into_os_string()
}

#[test]
fn test_installed_paths_round_trip() {
    let tree = FixtureTree::new()
        .unwrap()
        .file("top.txt")
        .unwrap()
        .file("a/one.txt")
        .unwrap()
        .file("a/b/two.txt")
        .unwrap()
        .dir("a/b/c")
        .unwrap()
        .dir("empty")
        .unwrap();
    let mut ev = ready_loop();

    let root = ev.add_watch_recursively(tree.root(), MASK).unwrap();

    // root, top.txt, a, one.txt, b, two.txt, c, empty
    assert_eq!(ev.tree().len(), 8);
    assert!(ev.is_recursive());
    assert!(ev.tree().is_consistent());
    assert_eq!(resolved(&ev, root), OsString::from(format!("{}/", tree.root().display())));

    for handle in ev.tree().handles() {
        let node = ev.tree().lookup(handle).unwrap();
        let path = ev.resolve_path(handle).unwrap();
        let meta = fs::symlink_metadata(&path).unwrap();
        assert_eq!(meta.is_dir(), node.is_dir(), "{path:?}");
        assert_eq!(path.to_string_lossy().ends_with('/'), node.is_dir(), "{path:?}");
    }
}

#[test]
fn test_rename_keeps_handles() {
    let tree = FixtureTree::new()
        .unwrap()
        .file("d1/a/inner.txt")
        .unwrap()
        .dir("d2")
        .unwrap();
    let mut ev = ready_loop();
    ev.add_watch_recursively(tree.root(), MASK).unwrap();
    let root = tree.root().display().to_string();

    let a = handle_at(&ev, &format!("{root}/d1/a/"));
    let inner = handle_at(&ev, &format!("{root}/d1/a/inner.txt"));
    let watches = ev.tree().len();

    fs::rename(tree.path("d1/a"), tree.path("d2/b")).unwrap();
    read_until(&mut ev, |e| e.is(EventMask::MOVED_TO));

    assert_eq!(resolved(&ev, a), OsString::from(format!("{root}/d2/b/")));
    assert_eq!(resolved(&ev, inner), OsString::from(format!("{root}/d2/b/inner.txt")));
    assert!(fs::metadata(ev.resolve_path(inner).unwrap()).is_ok());
    assert_eq!(ev.tree().len(), watches);
    assert!(ev.pending_rename().is_none());
    assert!(ev.tree().is_consistent());
}

#[test]
fn test_created_directory_is_followed() {
    let tree = FixtureTree::new().unwrap();
    let mut ev = ready_loop();
    let root = ev.add_watch_recursively(tree.root(), MASK).unwrap();

    fs::create_dir_all(tree.path("new/deep")).unwrap();
    read_until(&mut ev, |e| e.is(EventMask::CREATE) && e.name() == Some(OsStr::new("new")));

    let new = ev.tree().child_named(root, OsStr::new("new")).unwrap();
    assert_eq!(ev.tree().lookup(new).unwrap().parent(), Some(root));
    let deep = ev.tree().child_named(new, OsStr::new("deep")).unwrap();
    assert_eq!(
        resolved(&ev, deep),
        OsString::from(format!("{}/new/deep/", tree.root().display()))
    );
}

#[test]
fn test_self_deletion_drops_the_node() {
    let tree = FixtureTree::new().unwrap().file("f.txt").unwrap();
    let mut ev = ready_loop();
    let f = ev.add_watch(tree.path("f.txt"), EventMask::DELETE_SELF).unwrap();
    assert!(!ev.is_recursive());

    fs::remove_file(tree.path("f.txt")).unwrap();
    let seen = read_until(&mut ev, |e| e.is(EventMask::IGNORED));

    assert_eq!(seen.iter().filter(|e| e.is(EventMask::DELETE_SELF)).count(), 1);
    assert!(!ev.tree().contains(f));
    assert!(ev.tree().is_empty());
    assert_eq!(ev.last_error(), None);
}

#[test]
fn test_missing_path_records_enoent() {
    let tree = FixtureTree::new().unwrap();
    let mut ev = ready_loop();

    let err = ev.add_watch(tree.path("nope"), MASK).unwrap_err();
    assert_eq!(err.os_code(), Some(libc::ENOENT));
    assert_eq!(ev.last_error(), Some(libc::ENOENT));
    assert_eq!(ev.state(), LoopState::Error);
    assert!(ev.descriptor().is_some());
}
