use std::ffi::OsString;

use proptest::prelude::*;
use watchtree::types::{EventMask, WatchHandle};
use watchtree::watch::{WatchNode, WatchTree};

#[derive(Debug, Clone)]
enum Op {
    Insert { parent: usize, is_dir: bool },
    Remove(usize),
    Relocate { node: usize, parent: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), any::<bool>()).prop_map(|(parent, is_dir)| Op::Insert { parent, is_dir }),
        1 => any::<usize>().prop_map(Op::Remove),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(node, parent)| Op::Relocate { node, parent }),
    ]
}

fn live(tree: &WatchTree) -> Vec<WatchHandle> {
    let mut handles: Vec<_> = tree.handles().collect();
    handles.sort();
    handles
}

fn dirs(tree: &WatchTree) -> Vec<WatchHandle> {
    live(tree)
        .into_iter()
        .filter(|h| tree.lookup(*h).is_some_and(|n| n.is_dir()))
        .collect()
}

/// Every node's path is its parent's path plus its own name.
fn paths_compose(tree: &WatchTree) -> bool {
    tree.handles().all(|handle| {
        let Some(node) = tree.lookup(handle) else {
            return false;
        };
        let Some(path) = tree.resolve_path(handle) else {
            return false;
        };
        let Some(parent) = node.parent() else {
            return true;
        };
        let Some(parent_path) = tree.resolve_path(parent) else {
            return false;
        };

        let mut expected = OsString::from(parent_path);
        expected.push(node.name());
        if node.is_dir() {
            expected.push("/");
        }
        path.into_os_string() == expected
    })
}

proptest! {
    #[test]
    fn tree_stays_consistent(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut tree = WatchTree::new();
        let mut next = 1;
        let mut expected_len = 0usize;

        for op in ops {
            match op {
                Op::Insert { parent, is_dir } => {
                    let dirs = dirs(&tree);
                    let parent = match parent % (dirs.len() + 1) {
                        i if i == dirs.len() => None,
                        i => Some(dirs[i]),
                    };
                    let name = if parent.is_none() { format!("/r{next}") } else { format!("n{next}") };
                    let node = WatchNode::new(WatchHandle::new(next), parent, EventMask::ALL_EVENTS, name, is_dir);
                    prop_assert!(tree.insert(node));
                    next += 1;
                    expected_len += 1;
                }
                Op::Remove(idx) => {
                    let handles = live(&tree);
                    if handles.is_empty() {
                        continue;
                    }
                    let victim = handles[idx % handles.len()];
                    let removed = tree.remove(victim);
                    prop_assert_eq!(removed[0].handle(), victim);
                    for node in &removed {
                        prop_assert!(!tree.contains(node.handle()));
                    }
                    expected_len -= removed.len();
                    prop_assert!(tree.remove(victim).is_empty());
                }
                Op::Relocate { node, parent } => {
                    let handles = live(&tree);
                    let dirs = dirs(&tree);
                    if handles.is_empty() || dirs.is_empty() {
                        continue;
                    }
                    let moved = handles[node % handles.len()];
                    let target = dirs[parent % dirs.len()];
                    let before = tree.resolve_path(moved);

                    if tree.relocate(moved, target, format!("m{}", moved.raw())) {
                        prop_assert_eq!(tree.lookup(moved).unwrap().parent(), Some(target));
                        prop_assert!(tree.lookup(target).unwrap().children().contains(&moved));
                    } else {
                        prop_assert_eq!(tree.resolve_path(moved), before);
                    }
                }
            }

            prop_assert!(tree.is_consistent());
            prop_assert_eq!(tree.len(), expected_len);
            prop_assert!(paths_compose(&tree));
        }
    }

    #[test]
    fn inserts_under_unknown_parents_are_refused(parent in 1000i32..2000) {
        let mut tree = WatchTree::new();
        let node = WatchNode::new(WatchHandle::new(1), Some(WatchHandle::new(parent)), EventMask::CREATE, "x", false);
        prop_assert!(!tree.insert(node));
        prop_assert!(tree.is_empty());
    }
}
