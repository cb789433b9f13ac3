// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Descriptor storage keyed by (parent path, name).
//!
//! Keys are `parent_path ++ 0x00 ++ name`. Validated names and normalized
//! paths contain no control characters, so byte order on the encoded key is
//! the tuple order of (parent_path, name) and all children of a directory
//! sit next to each other. The descendants of a directory `P` are then two
//! prefix ranges: `P\0` for its children and `P/` for everything deeper.

use crate::descriptor::EntryDescriptor;
use crate::error::{Error, Result};
use crate::path;
use crate::persistence::{KeyRange, PersistenceLayer};
use diagnostics::debug;
use std::sync::Arc;

const KEY_SEPARATOR: u8 = 0;

/// Encode the composite key for an entry
pub fn entry_key(parent_path: &str, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(parent_path.len() + name.len() + 1);
    key.extend_from_slice(parent_path.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Key ranges that together hold every descendant of `dir_path`
pub fn descendant_ranges(dir_path: &str) -> Vec<KeyRange> {
    if path::is_root(dir_path) {
        // Every parent path starts with the separator
        return vec![KeyRange::prefix(path::ROOT)];
    }
    let mut children = dir_path.as_bytes().to_vec();
    children.push(KEY_SEPARATOR);
    let deeper = format!("{dir_path}{}", path::SEPARATOR);
    vec![KeyRange::prefix(children), KeyRange::prefix(deeper)]
}

#[derive(Clone)]
pub struct NamespaceStore {
    engine: Arc<dyn PersistenceLayer>,
    collection: String,
}

impl NamespaceStore {
    pub fn new(engine: Arc<dyn PersistenceLayer>, collection: String) -> Self {
        Self { engine, collection }
    }

    pub async fn get(&self, parent_path: &str, name: &str) -> Result<Option<EntryDescriptor>> {
        let key = entry_key(parent_path, name);
        match self.engine.get(&self.collection, &key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Insert a new descriptor. Exactly one of several racing inserts for
    /// the same key succeeds; the others fail with `EntryExists`.
    pub async fn insert_if_absent(&self, descriptor: &EntryDescriptor) -> Result<()> {
        let key = entry_key(descriptor.parent_path(), descriptor.name());
        let value = serde_json::to_vec(descriptor)?;
        match self.engine.add(&self.collection, &key, value).await {
            Err(Error::EntryExists(_)) => Err(Error::entry_exists(descriptor.path())),
            other => other,
        }
    }

    /// Overwrite an existing descriptor in place
    pub async fn put(&self, descriptor: &EntryDescriptor) -> Result<()> {
        let key = entry_key(descriptor.parent_path(), descriptor.name());
        let value = serde_json::to_vec(descriptor)?;
        self.engine.put(&self.collection, &key, value).await
    }

    pub async fn delete(&self, parent_path: &str, name: &str) -> Result<()> {
        debug!("namespace delete {parent} {name}", parent: parent_path, name: name);
        self.engine
            .delete(&self.collection, &entry_key(parent_path, name))
            .await
    }

    /// Descendants of `dir_path` as (absolute path, descriptor), in key order.
    ///
    /// Without `recursive` only entries one segment deeper than `dir_path`
    /// are returned. Depth is a segment count, never a string length.
    pub async fn scan_children(
        &self,
        dir_path: &str,
        recursive: bool,
    ) -> Result<Vec<(String, EntryDescriptor)>> {
        let child_depth = path::depth(dir_path) + 1;
        let mut found = Vec::new();
        for range in descendant_ranges(dir_path) {
            for (_key, value) in self.engine.scan(&self.collection, range).await? {
                let descriptor: EntryDescriptor = serde_json::from_slice(&value)?;
                let full_path = descriptor.path();
                if recursive || path::depth(&full_path) == child_depth {
                    found.push((full_path, descriptor));
                }
            }
        }
        Ok(found)
    }
}
