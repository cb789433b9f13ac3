// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::content::ContentStore;
use crate::directory::DirectoryService;
use crate::error::{Error, Result};
use crate::file::FileService;
use crate::handle::{DirectoryHandle, Services};
use crate::namespace::NamespaceStore;
use crate::path;
use crate::persistence::PersistenceLayer;
use diagnostics::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prefix shared by every collection this crate creates
pub const COLLECTION_PREFIX: &str = "__kvfs__";

const ENTRIES: &str = "entries";
const CONTENT: &str = "content";
const META: &str = "meta";
const FORMAT_KEY: &[u8] = b"format";
const FORMAT_VERSION: &[u8] = b"1";

fn default_name() -> String {
    "default".to_string()
}

/// Options for opening a filesystem instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FSOptions {
    /// Instance name; each name is an independent namespace in the engine
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for FSOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

impl FSOptions {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn collection(instance: &str, which: &str) -> String {
    format!("{COLLECTION_PREFIX}{instance}/{which}")
}

/// A named filesystem instance over a key-value engine
#[derive(Clone)]
pub struct FS {
    name: String,
    persistence: Arc<dyn PersistenceLayer>,
    services: Arc<Services>,
}

impl FS {
    /// Open (or create) the instance named in `options`
    pub async fn open<P: PersistenceLayer + 'static>(persistence: P, options: FSOptions) -> Result<Self> {
        Self::open_shared(Arc::new(persistence), options).await
    }

    /// Open over an engine that other instances may share
    pub async fn open_shared(
        persistence: Arc<dyn PersistenceLayer>,
        options: FSOptions,
    ) -> Result<Self> {
        if !persistence.is_available() {
            return Err(Error::not_supported(
                "key-value engine is not available in this environment",
            ));
        }
        let name = options.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid_name(options.name));
        }
        path::validate_name(&name)?;

        let meta = collection(&name, META);
        if persistence.get(&meta, FORMAT_KEY).await?.is_none() {
            persistence
                .put(&meta, FORMAT_KEY, FORMAT_VERSION.to_vec())
                .await?;
            info!("created filesystem instance {instance}", instance: name.as_str());
        } else {
            info!("opened filesystem instance {instance}", instance: name.as_str());
        }

        let namespace = NamespaceStore::new(persistence.clone(), collection(&name, ENTRIES));
        let content = ContentStore::new(persistence.clone(), collection(&name, CONTENT));
        let services = Arc::new(Services {
            directories: DirectoryService::new(namespace.clone(), content.clone()),
            files: FileService::new(namespace, content),
        });

        Ok(FS {
            name,
            persistence,
            services,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for the root directory, which always exists
    pub fn root(&self) -> DirectoryHandle {
        DirectoryHandle::root(self.services.clone())
    }

    pub fn persistence(&self) -> Arc<dyn PersistenceLayer> {
        self.persistence.clone()
    }

    /// Names of every instance stored in `persistence`, sorted
    pub async fn list_instances(persistence: &dyn PersistenceLayer) -> Result<Vec<String>> {
        let suffix = format!("/{META}");
        let mut names: Vec<String> = persistence
            .collections()
            .await?
            .into_iter()
            .filter_map(|c| {
                c.strip_prefix(COLLECTION_PREFIX)
                    .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl std::fmt::Debug for FS {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FS").field("name", &self.name).finish()
    }
}
