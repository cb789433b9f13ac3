// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::memory::{MemoryPersistence, new_fs};
use crate::path::resolve;
use crate::persistence::{KeyRange, PersistenceLayer};
use crate::{CreateWritableOptions, EntryDescriptor, FS, FSOptions, GetHandleOptions, RemoveOptions};
use async_trait::async_trait;
use futures::TryStreamExt;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};

async fn content_blobs(fs: &FS) -> usize {
    fs.persistence()
        .scan("__kvfs__default/content", KeyRange::prefix(b""))
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_docs_round_trip() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    let docs = root
        .get_directory_handle("docs", GetHandleOptions::create())
        .await
        .unwrap();
    let file = docs
        .get_file_handle("a.txt", GetHandleOptions::create())
        .await
        .unwrap();
    assert_eq!(file.get_content().await.unwrap().len(), 0);

    let mut stream = file
        .create_writable(CreateWritableOptions::default())
        .await
        .unwrap();
    stream.write("hi").unwrap();
    stream.close().await.unwrap();

    let content = file.get_content().await.unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content.bytes, b"hi");

    docs.remove_entry("a.txt", RemoveOptions::default())
        .await
        .unwrap();
    assert_eq!(
        docs.get_file_handle("a.txt", GetHandleOptions::default())
            .await
            .unwrap_err(),
        Error::not_found("/docs/a.txt")
    );

    // The directory itself survives
    let names: Vec<String> = root.keys().try_collect().await.unwrap();
    assert_eq!(names, vec!["docs"]);
}

#[test]
fn test_resolve_properties() {
    assert_eq!(resolve("/", "/").unwrap(), "/");
    assert_eq!(resolve("/a/b", "..").unwrap(), "/a");
    assert_eq!(resolve("/a/b", "../..").unwrap(), "/");
    assert_eq!(resolve("/a", "b/./c/../d").unwrap(), "/a/b/d");
    assert_eq!(resolve("/a", "/x/y/").unwrap(), "/x/y");
    assert!(matches!(resolve("/", ".."), Err(Error::InvalidPath(_))));

    // Resolving a normalized path again changes nothing
    for p in ["/", "/a", "/a/b/c"] {
        assert_eq!(resolve("/somewhere", p).unwrap(), p);
    }
}

#[tokio::test]
async fn test_concurrent_get_or_create_agrees() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    let tasks = (0..8).map(|_| {
        let root = root.clone();
        tokio::spawn(async move {
            root.get_file_handle("shared", GetHandleOptions::create())
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    // Racers either see the winner's entry or lose with EntryExists
    let mut keys = Vec::new();
    for result in results {
        match result {
            Ok(handle) => keys.push(handle.observed_key().to_string()),
            Err(err) => assert_eq!(err, Error::entry_exists("/shared")),
        }
    }
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|k| *k == keys[0]));

    // Losers clean up their content, leaving exactly one blob
    assert_eq!(content_blobs(&fs).await, 1);
}

/// Engine where a rival creator wins the first insert into an entries
/// collection, as if it ran between the lookup and the insert
struct RivalWinsFirstInsert {
    inner: MemoryPersistence,
    fired: AtomicBool,
}

impl RivalWinsFirstInsert {
    fn new() -> Self {
        Self {
            inner: MemoryPersistence::default(),
            fired: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PersistenceLayer for RivalWinsFirstInsert {
    async fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(collection, key).await
    }

    async fn put(&self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.inner.put(collection, key, value).await
    }

    async fn add(&self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        if collection.ends_with("/entries") && !self.fired.swap(true, Ordering::SeqCst) {
            let mut rival: EntryDescriptor = serde_json::from_slice(&value)?;
            if let EntryDescriptor::File(file) = &mut rival {
                file.file_key = "rival".to_string();
            }
            self.inner
                .add(collection, key, serde_json::to_vec(&rival)?)
                .await?;
        }
        self.inner.add(collection, key, value).await
    }

    async fn delete(&self, collection: &str, key: &[u8]) -> Result<()> {
        self.inner.delete(collection, key).await
    }

    async fn scan(&self, collection: &str, range: KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.scan(collection, range).await
    }

    async fn collections(&self) -> Result<Vec<String>> {
        self.inner.collections().await
    }
}

#[tokio::test]
async fn test_lost_file_creation_race_reports_entry_exists() {
    let fs = FS::open(RivalWinsFirstInsert::new(), FSOptions::default())
        .await
        .unwrap();
    let root = fs.root();

    assert_eq!(
        root.get_file_handle("x", GetHandleOptions::create())
            .await
            .unwrap_err(),
        Error::entry_exists("/x")
    );

    // The loser's blob is gone and the winner's entry is intact
    assert_eq!(content_blobs(&fs).await, 0);
    let winner = root
        .get_file_handle("x", GetHandleOptions::default())
        .await
        .unwrap();
    assert_eq!(winner.observed_key(), "rival");
}

#[tokio::test]
async fn test_lost_directory_creation_race_reports_entry_exists() {
    let fs = FS::open(RivalWinsFirstInsert::new(), FSOptions::default())
        .await
        .unwrap();
    let root = fs.root();

    assert_eq!(
        root.get_directory_handle("d", GetHandleOptions::create())
            .await
            .unwrap_err(),
        Error::entry_exists("/d")
    );
    tokio_test::assert_ok!(
        root.get_directory_handle("d", GetHandleOptions::default())
            .await
    );
}

#[tokio::test]
async fn test_nested_tree_recursive_removal() {
    let fs = new_fs().await.unwrap();
    let root = fs.root();

    for dir in ["/t/a", "/t/a/b", "/t/c"] {
        let handle = root.ensure_directory(dir).await.unwrap();
        let file = handle
            .get_file_handle("data.bin", GetHandleOptions::create())
            .await
            .unwrap();
        let mut stream = file
            .create_writable(CreateWritableOptions::default())
            .await
            .unwrap();
        stream.write(dir.as_bytes()).unwrap();
        stream.close().await.unwrap();
    }
    let keep = root.ensure_directory("/tt").await.unwrap();

    root.remove_entry("t", RemoveOptions::recursive())
        .await
        .unwrap();

    let names: Vec<String> = root.keys().try_collect().await.unwrap();
    assert_eq!(names, vec!["tt"]);
    assert!(keep.keys().try_collect::<Vec<String>>().await.unwrap().is_empty());

    assert_eq!(content_blobs(&fs).await, 0);
}
