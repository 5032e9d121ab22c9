//! Property-based tests for path resolution guarantees

use canopy::tree::TreeNode;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn segment() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

/// Deeply nested sibling chains must both resolve: dispatch searches every
/// child for the matching leading segment, not just the first.
#[test]
fn nested_sibling_chains_both_resolve() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec(segment(), 1..5),
                proptest::collection::vec(segment(), 1..5),
            ),
            |(left, right)| {
                prop_assume!(left[0] != right[0]);

                let mut root = TreeNode::root();
                for chain in [&left, &right] {
                    for depth in 0..chain.len() {
                        let dir_path = chain[..=depth].join("/");
                        root.insert(&dir_path, "dir", None).unwrap();
                    }
                }

                for chain in [&left, &right] {
                    let full = chain.join("/");
                    assert!(root.exists(&full), "exists({}) is false", full);
                    assert!(
                        root.exists(&format!("./{}", full)),
                        "exists(./{}) is false",
                        full
                    );
                    assert_eq!(root.kind(&full).unwrap().as_str(), "dir");
                }

                Ok(())
            },
        )
        .unwrap();
}

/// For every successfully inserted entry, `kind` and `sha` must report
/// exactly what was inserted.
#[test]
fn insert_lookup_round_trip() {
    let mut runner = proptest::test_runner::TestRunner::default();

    let entry = (
        segment(),
        0..3usize,
        proptest::option::of("[0-9a-f]{40}"),
    );

    runner
        .run(
            &proptest::collection::vec(entry, 1..16),
            |entries| {
                let mut root = TreeNode::root();
                let mut inserted: BTreeMap<String, (&str, Option<String>)> = BTreeMap::new();

                for (name, kind_idx, sha) in entries {
                    if inserted.contains_key(&name) {
                        continue;
                    }
                    let kind = ["dir", "file", "misc"][kind_idx];
                    root.insert(&name, kind, sha.as_deref()).unwrap();
                    inserted.insert(name, (kind, sha));
                }

                for (name, (kind, sha)) in &inserted {
                    assert!(root.exists(name));
                    assert_eq!(root.kind(name).unwrap().as_str(), *kind);
                    assert_eq!(
                        root.sha(name).map(|s| s.as_str().to_string()),
                        sha.clone()
                    );
                }

                Ok(())
            },
        )
        .unwrap();
}

/// Suffix search never fabricates paths: everything it returns exists and
/// ends with the requested suffix.
#[test]
fn suffix_search_results_are_sound() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec(segment(), 1..10),
                segment(),
            ),
            |(names, suffix)| {
                let mut root = TreeNode::root();
                for name in &names {
                    let _ = root.insert(name, "file", None);
                }

                for found in root.relative_paths(&suffix) {
                    assert!(found.ends_with(&suffix));
                    assert!(root.exists(&found), "exists({}) is false", found);
                }

                Ok(())
            },
        )
        .unwrap();
}
