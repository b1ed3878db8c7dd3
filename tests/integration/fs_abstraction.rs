// tests/integration/fs_abstraction.rs

use std::path::Path;

use watchtree::fs::mock::MockFileSystem;
use watchtree::fs::{EntryKind, FileSystem, RealFileSystem};
use watchtree_test_utils::builders::FixtureTree;

#[test]
fn test_real_fs_classifies_without_following_symlinks() {
    let tree = FixtureTree::new().unwrap().dir("d").unwrap().file("d/f.txt").unwrap();
    std::os::unix::fs::symlink(tree.path("d"), tree.path("link")).unwrap();

    let fs = RealFileSystem;
    assert_eq!(fs.classify(&tree.path("d")).unwrap(), EntryKind::Directory);
    assert_eq!(fs.classify(&tree.path("d/f.txt")).unwrap(), EntryKind::File);
    assert_eq!(fs.classify(&tree.path("link")).unwrap(), EntryKind::Other);

    let err = fs.classify(&tree.path("missing")).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
}

#[test]
fn test_real_and_mock_listings_agree() {
    let tree = FixtureTree::new()
        .unwrap()
        .file("top.txt")
        .unwrap()
        .dir("sub")
        .unwrap();
    let mock = MockFileSystem::new();
    mock.add_file("/w/top.txt");
    mock.add_dir("/w/sub");

    let mut real: Vec<_> = RealFileSystem
        .read_dir(tree.root())
        .unwrap()
        .into_iter()
        .map(|e| (e.name, e.kind))
        .collect();
    let mut fake: Vec<_> = mock
        .read_dir(Path::new("/w"))
        .unwrap()
        .into_iter()
        .map(|e| (e.name, e.kind))
        .collect();
    real.sort();
    fake.sort();

    assert_eq!(real, fake);
}
