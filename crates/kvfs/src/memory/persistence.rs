// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::persistence::{KeyRange, PersistenceLayer};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory persistence layer for testing and lightweight use.
/// Cloning shares the same underlying collections.
#[derive(Clone)]
pub struct MemoryPersistence {
    state: Arc<Mutex<State>>,
    available: bool,
}

#[derive(Default)]
struct State {
    // collection name -> sorted key space
    collections: HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            available: true,
        }
    }
}

impl MemoryPersistence {
    /// An engine that reports itself unavailable, as when the host
    /// environment lacks the required storage backend.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Total number of keys held in `collection`
    pub async fn key_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

impl State {
    fn get(&self, collection: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.collections.get(collection)?.get(key).cloned()
    }

    fn put(&mut self, collection: &str, key: &[u8], value: Vec<u8>) {
        _ = self
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_vec(), value);
    }

    fn add(&mut self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        let map = self.collections.entry(collection.to_string()).or_default();
        if map.contains_key(key) {
            return Err(Error::entry_exists(String::from_utf8_lossy(key)));
        }
        _ = map.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &[u8]) {
        if let Some(map) = self.collections.get_mut(collection) {
            _ = map.remove(key);
            if map.is_empty() {
                _ = self.collections.remove(collection);
            }
        }
    }

    fn scan(&self, collection: &str, range: &KeyRange) -> Vec<(Vec<u8>, Vec<u8>)> {
        let Some(map) = self.collections.get(collection) else {
            return Vec::new();
        };
        let end = match &range.end {
            // BTreeMap::range panics on inverted bounds
            Some(end) if *end <= range.start => return Vec::new(),
            Some(end) => Bound::Excluded(end.clone()),
            None => Bound::Unbounded,
        };
        map.range((Bound::Included(range.start.clone()), end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl PersistenceLayer for MemoryPersistence {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.lock().await.get(collection, key))
    }

    async fn put(&self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.state.lock().await.put(collection, key, value);
        Ok(())
    }

    async fn add(&self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.state.lock().await.add(collection, key, value)
    }

    async fn delete(&self, collection: &str, key: &[u8]) -> Result<()> {
        self.state.lock().await.delete(collection, key);
        Ok(())
    }

    async fn scan(&self, collection: &str, range: KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.state.lock().await.scan(collection, &range))
    }

    async fn collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.state.lock().await.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
