// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::content::{ContentStore, new_file_key};
use crate::descriptor::{EntryDescriptor, EntryKind};
use crate::error::{Error, Result};
use crate::handle::{DirectoryHandle, FileHandle, GetHandleOptions, Handle, Services};
use crate::namespace::NamespaceStore;
use crate::path;
use diagnostics::{debug, info};
use std::sync::Arc;

/// Directory operations over the namespace and content stores
#[derive(Clone)]
pub struct DirectoryService {
    namespace: NamespaceStore,
    content: ContentStore,
}

fn handle_for(descriptor: &EntryDescriptor, services: &Arc<Services>) -> Handle {
    match descriptor {
        EntryDescriptor::File(f) => Handle::File(FileHandle::new(
            &f.parent_path,
            &f.name,
            &f.file_key,
            services.clone(),
        )),
        EntryDescriptor::Directory(d) => Handle::Directory(DirectoryHandle::new(
            &d.parent_path,
            &d.name,
            services.clone(),
        )),
    }
}

impl DirectoryService {
    pub fn new(namespace: NamespaceStore, content: ContentStore) -> Self {
        Self { namespace, content }
    }

    /// The root always exists. Any other directory must have a directory
    /// descriptor.
    async fn check_directory(&self, dir_path: &str) -> Result<()> {
        let Some((parent, name)) = path::split(dir_path) else {
            return Ok(());
        };
        match self.namespace.get(&parent, &name).await? {
            Some(EntryDescriptor::Directory(_)) => Ok(()),
            Some(EntryDescriptor::File(_)) => {
                Err(Error::type_mismatch(dir_path, EntryKind::Directory))
            }
            None => Err(Error::not_found(dir_path)),
        }
    }

    /// Handle for an existing directory at an absolute path
    pub(crate) async fn directory_at(
        &self,
        dir_path: &str,
        services: Arc<Services>,
    ) -> Result<DirectoryHandle> {
        self.check_directory(dir_path).await?;
        Ok(match path::split(dir_path) {
            Some((parent, name)) => DirectoryHandle::new(&parent, &name, services),
            None => DirectoryHandle::root(services),
        })
    }

    /// Look up the child `name` of `dir`, creating it with `kind` when
    /// `options.create` is set and nothing is there.
    pub async fn get_child_handle(
        &self,
        dir: &DirectoryHandle,
        name: &str,
        kind: EntryKind,
        options: GetHandleOptions,
    ) -> Result<Handle> {
        path::validate_name(name)?;
        self.check_directory(dir.path()).await?;

        let child_path = path::join(dir.path(), name);
        if let Some(existing) = self.namespace.get(dir.path(), name).await? {
            if existing.kind() != kind {
                return Err(Error::type_mismatch(child_path, kind));
            }
            if options.create && options.exclusive {
                return Err(Error::entry_exists(child_path));
            }
            return Ok(handle_for(&existing, dir.services()));
        }
        if !options.create {
            return Err(Error::not_found(child_path));
        }

        // A lost creation race surfaces as EntryExists from the insert
        let descriptor = match kind {
            EntryKind::Directory => {
                let descriptor = EntryDescriptor::new_directory(dir.path(), name);
                self.namespace.insert_if_absent(&descriptor).await?;
                descriptor
            }
            EntryKind::File => {
                // The blob exists before any descriptor can point at it
                let file_key = new_file_key();
                self.content.insert(&file_key, Vec::new()).await?;
                let descriptor = EntryDescriptor::new_file(dir.path(), name, file_key.clone());
                if let Err(err) = self.namespace.insert_if_absent(&descriptor).await {
                    self.content.delete(&file_key).await?;
                    return Err(err);
                }
                descriptor
            }
        };
        debug!("created {kind} {path}", kind: kind.to_string(), path: child_path.as_str());
        Ok(handle_for(&descriptor, dir.services()))
    }

    /// Snapshot of the immediate children of `dir` as (name, handle)
    pub async fn list_children(&self, dir: &DirectoryHandle) -> Result<Vec<(String, Handle)>> {
        self.check_directory(dir.path()).await?;
        Ok(self
            .namespace
            .scan_children(dir.path(), false)
            .await?
            .into_iter()
            .map(|(_, d)| (d.name().to_string(), handle_for(&d, dir.services())))
            .collect())
    }

    /// Remove the child `name` of `dir_path`. A directory with any
    /// descendant is only removed when `recursive`; the check happens
    /// before anything is deleted.
    pub async fn remove_entry(&self, dir_path: &str, name: &str, recursive: bool) -> Result<()> {
        path::validate_name(name)?;
        let entry_path = path::join(dir_path, name);
        let descriptor = self
            .namespace
            .get(dir_path, name)
            .await?
            .ok_or_else(|| Error::not_found(&entry_path))?;

        match descriptor {
            EntryDescriptor::File(file) => {
                self.content.delete(&file.file_key).await?;
                self.namespace.delete(dir_path, name).await?;
                debug!("removed file {path}", path: entry_path.as_str());
            }
            EntryDescriptor::Directory(_) => {
                let mut descendants = self.namespace.scan_children(&entry_path, true).await?;
                if !descendants.is_empty() && !recursive {
                    return Err(Error::directory_not_empty(entry_path));
                }

                // Deepest first so no entry outlives its parent
                descendants.sort_by_key(|(p, _)| std::cmp::Reverse(path::depth(p)));
                let count = descendants.len();
                for (_, child) in descendants {
                    if let Some(file_key) = child.file_key() {
                        self.content.delete(file_key).await?;
                    }
                    self.namespace
                        .delete(child.parent_path(), child.name())
                        .await?;
                }
                self.namespace.delete(dir_path, name).await?;
                if count > 0 {
                    info!("removed {path} and {count} descendants", path: entry_path.as_str(), count: count);
                } else {
                    debug!("removed directory {path}", path: entry_path.as_str());
                }
            }
        }
        Ok(())
    }

    /// Segments from `from` down to `to`, or `None` if `to` is not inside
    /// `from`. Prefixes only match at segment boundaries.
    pub fn resolve_relative_path(from: &DirectoryHandle, to: &Handle) -> Option<Vec<String>> {
        path::relative_segments(from.path(), &to.path())
    }

    /// Directories carry no content key, so identity is the path
    pub fn is_same_entry(a: &Handle, b: &Handle) -> bool {
        match (a, b) {
            (Handle::Directory(a), Handle::Directory(b)) => a.path() == b.path(),
            _ => false,
        }
    }

    /// Resolve `relative` against `dir` and create every missing directory
    /// on the way down from the root
    pub async fn ensure_directory(
        &self,
        dir: &DirectoryHandle,
        relative: &str,
    ) -> Result<DirectoryHandle> {
        let target = path::resolve(dir.path(), relative)?;
        let mut current = DirectoryHandle::root(dir.services().clone());
        for segment in path::segments(&target) {
            current = self
                .get_child_handle(
                    &current,
                    segment,
                    EntryKind::Directory,
                    GetHandleOptions::create(),
                )
                .await?
                .into_directory()?;
        }
        Ok(current)
    }
}
