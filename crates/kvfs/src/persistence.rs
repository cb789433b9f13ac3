// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Result;
use async_trait::async_trait;

/// Pure key-value persistence: named collections of sorted byte keys.
///
/// Every call is atomic on its own. Nothing spans calls, so composite
/// filesystem operations are sequences of independent steps.
#[async_trait]
pub trait PersistenceLayer: Send + Sync {
    /// Whether the engine can be used at all in this environment
    fn is_available(&self) -> bool {
        true
    }

    async fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite
    async fn put(&self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Insert only if absent; fails with `EntryExists` otherwise
    async fn add(&self, collection: &str, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Deleting an absent key is not an error
    async fn delete(&self, collection: &str, key: &[u8]) -> Result<()>;

    /// All pairs with keys in `range`, in ascending key order
    async fn scan(&self, collection: &str, range: KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Names of every collection holding at least one key
    async fn collections(&self) -> Result<Vec<String>>;
}

/// Half-open key range `[start, end)`; `end: None` is unbounded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn new(start: Vec<u8>, end: Option<Vec<u8>>) -> Self {
        Self { start, end }
    }

    /// Every key that begins with `prefix`
    pub fn prefix<K: AsRef<[u8]>>(prefix: K) -> Self {
        let start = prefix.as_ref().to_vec();
        let mut end = start.clone();
        while let Some(last) = end.pop() {
            if last < u8::MAX {
                end.push(last + 1);
                return Self::new(start, Some(end));
            }
        }
        Self::new(start, None)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_ref().is_none_or(|end| key < end.as_slice())
    }
}
