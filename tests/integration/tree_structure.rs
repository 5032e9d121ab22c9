//! Integration tests for tree structure correctness

use canopy::tree::TreeNode;
use canopy::types::EntryKind;

fn sha(byte: char) -> String {
    byte.to_string().repeat(40)
}

fn sample_tree() -> TreeNode {
    let mut root = TreeNode::root();
    root.insert("src", "dir", Some(&sha('a'))).unwrap();
    root.insert("src/lib.rs", "file", Some(&sha('b'))).unwrap();
    root.insert("src/util", "dir", Some(&sha('c'))).unwrap();
    root.insert("src/util/helpers.rs", "file", Some(&sha('d')))
        .unwrap();
    root.insert("docs", "dir", Some(&sha('e'))).unwrap();
    root.insert("docs/diagram.png", "misc", Some(&sha('f')))
        .unwrap();
    root.insert("README.md", "file", Some(&sha('1'))).unwrap();
    root
}

#[test]
fn tree_contains_all_inserted_entries() {
    let tree = sample_tree();
    let contents = tree.flatten();

    // 3 directories + 3 files + 1 asset.
    assert_eq!(contents.len(), 7);
    for path in [
        "./src",
        "./src/lib.rs",
        "./src/util",
        "./src/util/helpers.rs",
        "./docs",
        "./docs/diagram.png",
        "./README.md",
    ] {
        assert!(contents.contains_key(path), "missing {}", path);
        assert!(tree.exists(path), "exists({}) is false", path);
    }
}

#[test]
fn children_are_owned_by_their_parent() {
    let tree = sample_tree();

    let names: Vec<&str> = tree.child_dirs().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["src", "docs"]);

    let src = &tree.child_dirs()[0];
    assert_eq!(src.relative_path(), "./src");
    assert_eq!(src.files().len(), 1);
    assert_eq!(src.child_dirs().len(), 1);
    assert_eq!(src.child_dirs()[0].relative_path(), "./src/util");
}

#[test]
fn relative_paths_are_computed_with_the_join_rule() {
    let tree = sample_tree();
    let contents = tree.flatten();

    let record = &contents["./src/util/helpers.rs"];
    assert_eq!(record.name, "helpers.rs");
    assert_eq!(record.sha.as_ref().unwrap().as_str(), sha('d'));
}

#[test]
fn identical_insert_sequences_produce_identical_trees() {
    let first = sample_tree();
    let second = sample_tree();

    assert_eq!(first.relative_paths(""), second.relative_paths(""));
    assert_eq!(first.flatten(), second.flatten());
    assert_eq!(format!("{}", first), format!("{}", second));
}

#[test]
fn leaf_insertion_order_does_not_change_flattened_contents() {
    let mut forward = TreeNode::root();
    forward.insert("a.txt", "file", Some(&sha('a'))).unwrap();
    forward.insert("b.txt", "file", Some(&sha('b'))).unwrap();

    let mut reverse = TreeNode::root();
    reverse.insert("b.txt", "file", Some(&sha('b'))).unwrap();
    reverse.insert("a.txt", "file", Some(&sha('a'))).unwrap();

    assert_eq!(forward.flatten(), reverse.flatten());
}

#[test]
fn kinds_survive_a_full_build() {
    let tree = sample_tree();
    assert_eq!(tree.kind("src/util"), Some(EntryKind::Dir));
    assert_eq!(tree.kind("src/util/helpers.rs"), Some(EntryKind::File));
    assert_eq!(tree.kind("docs/diagram.png"), Some(EntryKind::Misc));
    assert_eq!(tree.kind("docs/missing.png"), None);
}
