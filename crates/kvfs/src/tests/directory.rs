// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use crate::memory::new_fs;
use crate::{EntryKind, GetHandleOptions, Handle, RemoveOptions};
use futures::TryStreamExt;

fn open() -> GetHandleOptions {
    GetHandleOptions::default()
}

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    let first = root
        .get_file_handle("a.txt", GetHandleOptions::create())
        .await
        .unwrap();
    let second = root
        .get_file_handle("a.txt", GetHandleOptions::create())
        .await
        .unwrap();

    // One descriptor, one file key
    assert_eq!(first.observed_key(), second.observed_key());
    assert!(first.is_same_entry(&second.clone().into()).await.unwrap());

    let names: Vec<String> = root.keys().try_collect().await.unwrap();
    assert_eq!(names, vec!["a.txt"]);
}

#[tokio::test]
async fn test_missing_child_without_create() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    assert_eq!(
        root.get_directory_handle("nope", open()).await.unwrap_err(),
        Error::not_found("/nope")
    );
    assert_eq!(
        root.get_file_handle("nope", open()).await.unwrap_err(),
        Error::not_found("/nope")
    );
}

#[tokio::test]
async fn test_kind_mismatch() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    root.get_directory_handle("d", GetHandleOptions::create())
        .await
        .unwrap();
    root.get_file_handle("f", GetHandleOptions::create())
        .await
        .unwrap();

    assert_eq!(
        root.get_file_handle("d", GetHandleOptions::create())
            .await
            .unwrap_err(),
        Error::type_mismatch("/d", EntryKind::File)
    );
    assert_eq!(
        root.get_directory_handle("f", open()).await.unwrap_err(),
        Error::type_mismatch("/f", EntryKind::Directory)
    );
}

#[tokio::test]
async fn test_exclusive_create() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    tokio_test::assert_ok!(
        root.get_file_handle("x", GetHandleOptions::create_new())
            .await
    );
    assert_eq!(
        root.get_file_handle("x", GetHandleOptions::create_new())
            .await
            .unwrap_err(),
        Error::entry_exists("/x")
    );

    // The failed attempt must not leave a second content blob behind
    let content = fs.persistence();
    let blobs = content
        .scan("__kvfs__default/content", crate::KeyRange::prefix(b""))
        .await
        .unwrap();
    assert_eq!(blobs.len(), 1);
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    for name in ["", "a/b", "a:b", "NUL", "lpt1.txt", "trailing.", "x..y"] {
        let err = root
            .get_file_handle(name, GetHandleOptions::create())
            .await
            .unwrap_err();
        assert_eq!(err, Error::invalid_name(name), "{name:?}");
    }
}

#[tokio::test]
async fn test_list_root_excludes_grandchildren() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    let a = root
        .get_directory_handle("a", GetHandleOptions::create())
        .await
        .unwrap();
    a.get_directory_handle("b", GetHandleOptions::create())
        .await
        .unwrap();

    let names: Vec<String> = root.keys().try_collect().await.unwrap();
    assert_eq!(names, vec!["a"]);

    let children: Vec<Handle> = a.values().try_collect().await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path(), "/a/b");
    assert_eq!(children[0].kind(), EntryKind::Directory);
}

#[tokio::test]
async fn test_listing_is_sorted_and_lazy() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    for name in ["zeta", "alpha", "mid"] {
        root.get_file_handle(name, GetHandleOptions::create())
            .await
            .unwrap();
    }

    // Nothing is read until the stream is polled
    let entries = root.entries();
    root.get_directory_handle("beta", GetHandleOptions::create())
        .await
        .unwrap();

    let listed: Vec<(String, Handle)> = entries.try_collect().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "mid", "zeta"]);
    assert_eq!(listed[1].1.kind(), EntryKind::Directory);
}

#[tokio::test]
async fn test_listing_does_not_leak_prefix_siblings() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    let a = root
        .get_directory_handle("a", GetHandleOptions::create())
        .await
        .unwrap();
    let ab = root
        .get_directory_handle("ab", GetHandleOptions::create())
        .await
        .unwrap();
    a.get_file_handle("in_a", GetHandleOptions::create())
        .await
        .unwrap();
    ab.get_file_handle("in_ab", GetHandleOptions::create())
        .await
        .unwrap();

    let names: Vec<String> = a.keys().try_collect().await.unwrap();
    assert_eq!(names, vec!["in_a"]);
}

#[tokio::test]
async fn test_remove_non_empty_requires_recursive() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    let dir = root
        .get_directory_handle("dir", GetHandleOptions::create())
        .await
        .unwrap();
    let sub = dir
        .get_directory_handle("sub", GetHandleOptions::create())
        .await
        .unwrap();
    sub.get_file_handle("leaf", GetHandleOptions::create())
        .await
        .unwrap();

    assert_eq!(
        root.remove_entry("dir", RemoveOptions::default())
            .await
            .unwrap_err(),
        Error::directory_not_empty("/dir")
    );

    // Nothing was touched
    tokio_test::assert_ok!(sub.get_file_handle("leaf", open()).await);
    tokio_test::assert_ok!(dir.get_directory_handle("sub", open()).await);

    root.remove_entry("dir", RemoveOptions::recursive())
        .await
        .unwrap();

    assert_eq!(
        root.get_directory_handle("dir", open()).await.unwrap_err(),
        Error::not_found("/dir")
    );
    // Stale handles to former descendants see their parent gone
    assert_eq!(
        dir.get_directory_handle("sub", open()).await.unwrap_err(),
        Error::not_found("/dir")
    );
    assert_eq!(
        sub.get_file_handle("leaf", open()).await.unwrap_err(),
        Error::not_found("/dir/sub")
    );

    // Every descriptor and blob is gone
    let engine = fs.persistence();
    let remaining = engine.collections().await.unwrap();
    assert_eq!(remaining, vec!["__kvfs__default/meta".to_string()]);
}

#[tokio::test]
async fn test_remove_empty_directory_and_missing_entry() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    let empty = root
        .get_directory_handle("empty", GetHandleOptions::create())
        .await
        .unwrap();

    empty.remove(RemoveOptions::default()).await.unwrap();
    assert_eq!(
        root.remove_entry("empty", RemoveOptions::default())
            .await
            .unwrap_err(),
        Error::not_found("/empty")
    );
}

#[tokio::test]
async fn test_root_cannot_be_removed() {
    let fs = new_fs().await.unwrap();
    let err = fs
        .root()
        .remove(RemoveOptions::recursive())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_resolve_at_segment_boundaries() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    let a = root
        .get_directory_handle("a", GetHandleOptions::create())
        .await
        .unwrap();
    let ab = root
        .get_directory_handle("ab", GetHandleOptions::create())
        .await
        .unwrap();
    let deep = a.ensure_directory("b/c").await.unwrap();

    assert_eq!(a.resolve(&ab.clone().into()), None);
    assert_eq!(
        a.resolve(&deep.clone().into()),
        Some(vec!["b".to_string(), "c".to_string()])
    );
    assert_eq!(root.resolve(&a.clone().into()), Some(vec!["a".to_string()]));
    assert_eq!(a.resolve(&a.clone().into()), Some(vec![]));
    assert_eq!(deep.resolve(&a.into()), None);
}

#[tokio::test]
async fn test_directory_identity_is_path() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    let one = root
        .get_directory_handle("d", GetHandleOptions::create())
        .await
        .unwrap();
    let two = root.get_directory_handle("d", open()).await.unwrap();
    let file = root
        .get_file_handle("f", GetHandleOptions::create())
        .await
        .unwrap();

    assert!(one.is_same_entry(&two.clone().into()));
    assert!(!one.is_same_entry(&root.clone().into()));
    assert!(!one.is_same_entry(&file.clone().into()));
    assert!(!Handle::from(file).is_same_entry(&two.into()).await.unwrap());
}

#[tokio::test]
async fn test_ensure_directory_and_get_parent() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    let c = root.ensure_directory("/a/b/c").await.unwrap();
    assert_eq!(c.path(), "/a/b/c");

    // Existing prefixes are reused, relative paths resolve from the handle
    let b = c.get_parent().await.unwrap();
    assert_eq!(b.path(), "/a/b");
    let d = b.ensure_directory("../x/./d").await.unwrap();
    assert_eq!(d.path(), "/a/x/d");

    let a = b.get_parent().await.unwrap();
    assert_eq!(a.path(), "/a");
    let top = a.get_parent().await.unwrap();
    assert!(top.is_root());
    assert!(top.get_parent().await.unwrap().is_root());

    let names: Vec<String> = a.keys().try_collect().await.unwrap();
    assert_eq!(names, vec!["b", "x"]);
}

#[tokio::test]
async fn test_ensure_directory_through_file_fails() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();
    root.get_file_handle("f", GetHandleOptions::create())
        .await
        .unwrap();

    assert_eq!(
        root.ensure_directory("f/sub").await.unwrap_err(),
        Error::type_mismatch("/f", EntryKind::Directory)
    );
}
