//! Integration tests for path resolution against the public query surface

use canopy::error::TreeError;
use canopy::tree::TreeNode;
use canopy::types::EntryKind;

fn sha(byte: char) -> String {
    byte.to_string().repeat(40)
}

#[test]
fn root_aliases_resolve_everywhere() {
    let root = TreeNode::root();
    for alias in ["", ".", "./"] {
        assert!(root.exists(alias));
        assert_eq!(root.kind(alias), Some(EntryKind::Dir));
        assert!(root.sha(alias).is_none());
    }
}

#[test]
fn every_accepted_path_form_resolves_identically() {
    let mut root = TreeNode::root();
    root.insert("bin", "dir", Some(&sha('a'))).unwrap();
    root.insert("bin/tool.py", "file", Some(&sha('b'))).unwrap();

    for form in ["bin/tool.py", "./bin/tool.py", "/bin/tool.py"] {
        assert!(root.exists(form), "exists({}) is false", form);
        assert_eq!(root.kind(form), Some(EntryKind::File));
        assert_eq!(root.sha(form).unwrap().as_str(), sha('b'));
    }
}

#[test]
fn lookups_match_full_paths_not_basenames() {
    let mut root = TreeNode::root();
    root.insert("nested", "dir", Some(&sha('a'))).unwrap();
    root.insert("nested/target.txt", "file", Some(&sha('b')))
        .unwrap();

    // The basename alone does not exist at the root.
    assert!(!root.exists("target.txt"));
    assert_eq!(root.kind("target.txt"), None);
    assert!(root.sha("target.txt").is_none());
    assert!(root.exists("nested/target.txt"));
}

#[test]
fn suffix_search_finds_every_occurrence() {
    let mut root = TreeNode::root();
    root.insert("bin", "dir", Some(&sha('a'))).unwrap();
    root.insert("bin/common.py", "file", Some(&sha('b'))).unwrap();
    root.insert("lib", "dir", Some(&sha('c'))).unwrap();
    root.insert("lib/file1.py", "file", Some(&sha('d'))).unwrap();
    root.insert("common.py", "file", Some(&sha('e'))).unwrap();
    root.insert("file2.py", "file", Some(&sha('f'))).unwrap();

    let mut found = root.relative_paths("common.py");
    found.sort();
    assert_eq!(
        found,
        vec!["./bin/common.py".to_string(), "./common.py".to_string()]
    );
}

#[test]
fn insertion_failures_leave_the_tree_untouched() {
    let mut root = TreeNode::root();
    root.insert("src", "dir", Some(&sha('a'))).unwrap();

    let failures = [
        root.insert("src/deep/file.rs", "file", Some(&sha('b')))
            .unwrap_err(),
        root.insert("src/x.rs", "file", Some("deadbeef")).unwrap_err(),
        root.insert("src/x.rs", "symlink", Some(&sha('b'))).unwrap_err(),
    ];
    assert!(matches!(
        failures[0],
        TreeError::MissingParentDirectory { .. }
    ));
    assert!(matches!(failures[1], TreeError::MalformedHash { .. }));
    assert!(matches!(failures[2], TreeError::InvalidContentType { .. }));

    // Only the successful insert is visible.
    assert_eq!(root.flatten().len(), 1);
}

#[test]
fn directories_must_arrive_before_descendants() {
    let mut root = TreeNode::root();
    root.insert("a", "dir", Some(&sha('a'))).unwrap();
    root.insert("a/b", "dir", Some(&sha('b'))).unwrap();
    root.insert("a/b/c", "dir", Some(&sha('c'))).unwrap();
    root.insert("a/b/c/deep.txt", "file", Some(&sha('d'))).unwrap();

    assert!(root.exists("a/b/c/deep.txt"));
    assert_eq!(root.sha("a/b/c/deep.txt").unwrap().as_str(), sha('d'));

    // Skipping a level is rejected at the missing segment.
    let err = root
        .insert("a/missing/under.txt", "file", Some(&sha('e')))
        .unwrap_err();
    assert_eq!(
        err,
        TreeError::MissingParentDirectory {
            path: "a/missing/under.txt".to_string(),
            segment: "missing".to_string(),
        }
    );
}

#[test]
fn directory_sha_is_the_childs_own_sha() {
    let mut root = TreeNode::root();
    root.insert("pkg", "dir", Some(&sha('7'))).unwrap();
    root.insert("pkg/inner", "dir", Some(&sha('8'))).unwrap();

    assert_eq!(root.sha("pkg").unwrap().as_str(), sha('7'));
    assert_eq!(root.sha("pkg/inner").unwrap().as_str(), sha('8'));
}
