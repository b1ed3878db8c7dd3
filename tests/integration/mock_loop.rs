// tests/integration/mock_loop.rs

use std::ffi::OsStr;
use std::path::Path;

use watchtree::engine::{EventLoopOptions, LoopState};
use watchtree::types::{EventMask, RenameCorrelation};
use watchtree_test_utils::builders::MockLoopBuilder;
use watchtree_test_utils::init_tracing;

fn two_dirs() -> MockLoopBuilder {
    init_tracing();
    MockLoopBuilder::new()
        .with_file("/w/d1/a/inner.txt")
        .with_file("/w/d1/keep.txt")
        .with_dir("/w/d2")
}

#[test]
fn test_rename_split_across_batches_is_correlated() {
    let (mut ev, facility, _fs) = two_dirs().build();
    ev.add_watch_recursively("/w", EventMask::ALL_EVENTS).unwrap();
    let (d1, d2, a) = (
        facility.handle_for("/w/d1").unwrap(),
        facility.handle_for("/w/d2").unwrap(),
        facility.handle_for("/w/d1/a").unwrap(),
    );
    let watches = facility.watch_count();

    facility.push_event(d1, EventMask::MOVED_FROM | EventMask::ISDIR, 42, Some("a"));
    facility.push_event(d2, EventMask::MOVED_TO | EventMask::ISDIR, 42, Some("b"));
    facility.push_event(a, EventMask::MOVE_SELF, 0, None);

    let first = ev.read_events(1).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(ev.buffered(), 2);
    assert!(ev.pending_rename().is_some());

    let rest = ev.read_events(8).unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(ev.resolve_path(a).unwrap().as_os_str(), "/w/d2/b/");
    assert!(facility.removed().is_empty());
    assert_eq!(facility.watch_count(), watches);
}

#[test]
fn test_interleaved_renames_in_cookie_mode() {
    let options = EventLoopOptions {
        rename_correlation: RenameCorrelation::Cookie,
        ..EventLoopOptions::default()
    };
    let (mut ev, facility, fs) = two_dirs().with_options(options).build();
    ev.add_watch_recursively("/w", EventMask::ALL_EVENTS).unwrap();
    let (d1, d2, a) = (
        facility.handle_for("/w/d1").unwrap(),
        facility.handle_for("/w/d2").unwrap(),
        facility.handle_for("/w/d1/a").unwrap(),
    );

    // a leaves for an unwatched place while an unrelated file arrives in d2
    fs.remove("/w/d1/a");
    fs.add_file("/w/d2/arrived.txt");
    facility.push_event(d1, EventMask::MOVED_FROM | EventMask::ISDIR, 1, Some("a"));
    facility.push_event(d2, EventMask::MOVED_TO, 2, Some("arrived.txt"));

    let events = ev.read_events(8).unwrap();
    assert_eq!(events.len(), 2);
    assert!(!ev.tree().contains(a));
    let arrived = facility.handle_for("/w/d2/arrived.txt").unwrap();
    assert_eq!(ev.resolve_path(arrived).unwrap().as_os_str(), "/w/d2/arrived.txt");
    assert!(ev.tree().is_consistent());
}

#[test]
fn test_self_deleted_records_are_delivered_once() {
    let (mut ev, facility, _fs) = two_dirs().build();
    ev.add_watch_recursively("/w", EventMask::ALL_EVENTS).unwrap();
    let d1 = facility.handle_for("/w/d1").unwrap();
    let keep = facility.handle_for("/w/d1/keep.txt").unwrap();

    facility.push_event(keep, EventMask::DELETE_SELF, 0, None);
    facility.push_event(keep, EventMask::IGNORED, 0, None);
    facility.push_event(d1, EventMask::DELETE, 0, Some("keep.txt"));

    let events = ev.read_events(8).unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.mask).collect();
    assert_eq!(
        kinds,
        [EventMask::DELETE_SELF, EventMask::IGNORED, EventMask::DELETE]
    );
    assert!(!ev.tree().contains(keep));
    assert!(ev.tree().child_named(d1, OsStr::new("keep.txt")).is_none());

    facility.push_event(d1, EventMask::MODIFY, 0, None);
    let later = ev.read_events(8).unwrap();
    assert_eq!(later.len(), 1);
    assert!(later[0].is(EventMask::MODIFY));
}

#[test]
fn test_failed_recursive_install_keeps_earlier_watches() {
    init_tracing();
    let (mut ev, facility, _fs) = MockLoopBuilder::new()
        .with_dir("/w/a")
        .with_dir("/w/b")
        .with_dir("/w/c")
        .build();
    facility.fail_add_watch("/w/b", libc::EACCES);

    let err = ev.add_watch_recursively("/w", EventMask::ALL_EVENTS).unwrap_err();
    assert_eq!(err.os_code(), Some(libc::EACCES));
    assert_eq!(ev.last_error(), Some(libc::EACCES));
    assert_eq!(ev.state(), LoopState::Error);
    assert!(!ev.is_recursive());

    // /w and /w/a were installed before the failure
    assert_eq!(ev.tree().len(), 2);
    assert!(facility.handle_for("/w/a").is_some());

    ev.clear_all();
    assert!(ev.tree().is_empty());
    assert_eq!(facility.watch_count(), 0);
    assert!(ev.descriptor().is_some());
}

#[test]
fn test_non_directory_root_is_rejected() {
    init_tracing();
    let (mut ev, _facility, _fs) = MockLoopBuilder::new().with_file("/w/file").build();

    let err = ev
        .add_watch_recursively(Path::new("/w/file"), EventMask::ALL_EVENTS)
        .unwrap_err();
    assert_eq!(err.os_code(), Some(libc::ENOTDIR));
    assert_eq!(ev.last_error(), Some(libc::ENOTDIR));
    assert!(ev.tree().is_empty());
}
