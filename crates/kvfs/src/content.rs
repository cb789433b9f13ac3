// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Result;
use crate::persistence::PersistenceLayer;
use std::sync::Arc;

/// Raw file payloads keyed by opaque file key
#[derive(Clone)]
pub struct ContentStore {
    engine: Arc<dyn PersistenceLayer>,
    collection: String,
}

/// Generate a fresh file key, unrelated to any path
pub fn new_file_key() -> String {
    uuid7::uuid7().to_string()
}

impl ContentStore {
    pub fn new(engine: Arc<dyn PersistenceLayer>, collection: String) -> Self {
        Self { engine, collection }
    }

    pub async fn get(&self, file_key: &str) -> Result<Option<Vec<u8>>> {
        self.engine.get(&self.collection, file_key.as_bytes()).await
    }

    pub async fn put(&self, file_key: &str, bytes: Vec<u8>) -> Result<()> {
        self.engine
            .put(&self.collection, file_key.as_bytes(), bytes)
            .await
    }

    /// Create the blob for a new file key; fails if the key is taken
    pub async fn insert(&self, file_key: &str, bytes: Vec<u8>) -> Result<()> {
        self.engine
            .add(&self.collection, file_key.as_bytes(), bytes)
            .await
    }

    pub async fn delete(&self, file_key: &str) -> Result<()> {
        self.engine
            .delete(&self.collection, file_key.as_bytes())
            .await
    }
}
