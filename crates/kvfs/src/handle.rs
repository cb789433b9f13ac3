// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Handles are cheap, ephemeral references to an entry by
//! `(parent_path, name)`. They are never persisted and hold no entry state
//! of their own: every operation resolves the descriptor again. A file
//! handle also remembers the file key it observed when obtained, which is
//! used only to tell a stale handle from a fresh one.

use crate::descriptor::{EntryKind, EntryMetadata};
use crate::directory::DirectoryService;
use crate::error::{Error, Result};
use crate::file::{FileContent, FileService};
use crate::path;
use crate::writable::{WritableByteStream, WriteData};
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Stream of directory listing items
pub type EntryStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetHandleOptions {
    pub create: bool,
    /// With `create`, fail `EntryExists` instead of returning an existing entry
    pub exclusive: bool,
}

impl GetHandleOptions {
    pub fn create() -> Self {
        Self {
            create: true,
            exclusive: false,
        }
    }

    pub fn create_new() -> Self {
        Self {
            create: true,
            exclusive: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub recursive: bool,
}

impl RemoveOptions {
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateWritableOptions {
    pub keep_existing_data: bool,
}

impl CreateWritableOptions {
    pub fn keep_existing_data() -> Self {
        Self {
            keep_existing_data: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    Read,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Services shared by every handle of one filesystem instance
pub(crate) struct Services {
    pub(crate) directories: DirectoryService,
    pub(crate) files: FileService,
}

/// A file or a directory
#[derive(Clone)]
pub enum Handle {
    File(FileHandle),
    Directory(DirectoryHandle),
}

impl Handle {
    pub fn kind(&self) -> EntryKind {
        match self {
            Handle::File(_) => EntryKind::File,
            Handle::Directory(_) => EntryKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Handle::File(f) => f.name(),
            Handle::Directory(d) => d.name(),
        }
    }

    pub fn parent_path(&self) -> &str {
        match self {
            Handle::File(f) => f.parent_path(),
            Handle::Directory(d) => d.parent_path(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Handle::File(f) => f.path(),
            Handle::Directory(d) => d.path().to_string(),
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Handle::File(f) => Some(f),
            Handle::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryHandle> {
        match self {
            Handle::File(_) => None,
            Handle::Directory(d) => Some(d),
        }
    }

    pub fn into_file(self) -> Result<FileHandle> {
        match self {
            Handle::File(f) => Ok(f),
            Handle::Directory(d) => Err(Error::type_mismatch(d.path(), EntryKind::File)),
        }
    }

    pub fn into_directory(self) -> Result<DirectoryHandle> {
        match self {
            Handle::File(f) => Err(Error::type_mismatch(f.path(), EntryKind::Directory)),
            Handle::Directory(d) => Ok(d),
        }
    }

    pub async fn is_same_entry(&self, other: &Handle) -> Result<bool> {
        match self {
            Handle::File(f) => f.is_same_entry(other).await,
            Handle::Directory(d) => Ok(d.is_same_entry(other)),
        }
    }

    pub async fn remove(&self, options: RemoveOptions) -> Result<()> {
        match self {
            Handle::File(f) => f.remove().await,
            Handle::Directory(d) => d.remove(options).await,
        }
    }

    pub async fn get_parent(&self) -> Result<DirectoryHandle> {
        match self {
            Handle::File(f) => f.get_parent().await,
            Handle::Directory(d) => d.get_parent().await,
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::File(file) => file.fmt(f),
            Handle::Directory(dir) => dir.fmt(f),
        }
    }
}

impl From<FileHandle> for Handle {
    fn from(file: FileHandle) -> Self {
        Handle::File(file)
    }
}

impl From<DirectoryHandle> for Handle {
    fn from(dir: DirectoryHandle) -> Self {
        Handle::Directory(dir)
    }
}

#[derive(Clone)]
pub struct FileHandle {
    name: String,
    parent_path: String,
    file_key: String,
    services: Arc<Services>,
}

impl FileHandle {
    pub(crate) fn new(
        parent_path: &str,
        name: &str,
        file_key: &str,
        services: Arc<Services>,
    ) -> Self {
        Self {
            name: name.to_string(),
            parent_path: parent_path.to_string(),
            file_key: file_key.to_string(),
            services,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    pub fn path(&self) -> String {
        path::join(&self.parent_path, &self.name)
    }

    /// File key seen when this handle was obtained
    pub(crate) fn observed_key(&self) -> &str {
        &self.file_key
    }

    /// Read the whole file
    pub async fn get_content(&self) -> Result<FileContent> {
        self.services.files.read_all(self).await
    }

    pub async fn create_writable(
        &self,
        options: CreateWritableOptions,
    ) -> Result<WritableByteStream> {
        self.services.files.open_writable(self, options).await
    }

    pub async fn metadata(&self) -> Result<EntryMetadata> {
        self.services.files.metadata(self).await
    }

    /// Replace the whole content with `data`
    pub async fn write_all<D: Into<WriteData>>(&self, data: D) -> Result<()> {
        let data = data.into();
        let mut stream = self.create_writable(CreateWritableOptions::default()).await?;
        stream.write(data)?;
        stream.close().await
    }

    /// Add `data` after the current content
    pub async fn append<D: Into<WriteData>>(&self, data: D) -> Result<()> {
        let data = data.into();
        let mut stream = self
            .create_writable(CreateWritableOptions::keep_existing_data())
            .await?;
        stream.seek(stream.len())?;
        stream.write(data)?;
        stream.close().await
    }

    /// The whole content as UTF-8 text
    pub async fn read_text(&self) -> Result<String> {
        let content = self.get_content().await?;
        String::from_utf8(content.bytes)
            .map_err(|e| Error::invalid_state(format!("{} is not UTF-8 text: {e}", self.path())))
    }

    pub async fn remove(&self) -> Result<()> {
        self.services.files.remove(self).await
    }

    pub async fn is_same_entry(&self, other: &Handle) -> Result<bool> {
        self.services
            .files
            .is_same_entry(&Handle::File(self.clone()), other)
            .await
    }

    pub async fn get_parent(&self) -> Result<DirectoryHandle> {
        self.services
            .directories
            .directory_at(&self.parent_path, self.services.clone())
            .await
    }

    pub fn query_permission(&self, _mode: PermissionMode) -> PermissionState {
        PermissionState::Granted
    }

    pub async fn request_permission(&self, _mode: PermissionMode) -> PermissionState {
        PermissionState::Granted
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path())
            .field("file_key", &self.file_key)
            .finish()
    }
}

#[derive(Clone)]
pub struct DirectoryHandle {
    name: String,
    parent_path: String,
    path: String,
    services: Arc<Services>,
}

impl DirectoryHandle {
    pub(crate) fn root(services: Arc<Services>) -> Self {
        Self {
            name: path::ROOT.to_string(),
            parent_path: path::ROOT.to_string(),
            path: path::ROOT.to_string(),
            services,
        }
    }

    pub(crate) fn new(parent_path: &str, name: &str, services: Arc<Services>) -> Self {
        Self {
            name: name.to_string(),
            parent_path: parent_path.to_string(),
            path: path::join(parent_path, name),
            services,
        }
    }

    pub(crate) fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        path::is_root(&self.path)
    }

    pub async fn get_directory_handle(
        &self,
        name: &str,
        options: GetHandleOptions,
    ) -> Result<DirectoryHandle> {
        self.services
            .directories
            .get_child_handle(self, name, EntryKind::Directory, options)
            .await?
            .into_directory()
    }

    pub async fn get_file_handle(
        &self,
        name: &str,
        options: GetHandleOptions,
    ) -> Result<FileHandle> {
        self.services
            .directories
            .get_child_handle(self, name, EntryKind::File, options)
            .await?
            .into_file()
    }

    /// Remove the child `name`. Directories with descendants need
    /// `recursive`.
    pub async fn remove_entry(&self, name: &str, options: RemoveOptions) -> Result<()> {
        self.services
            .directories
            .remove_entry(&self.path, name, options.recursive)
            .await
    }

    /// Remove this directory from its parent. The root cannot be removed.
    pub async fn remove(&self, options: RemoveOptions) -> Result<()> {
        if self.is_root() {
            return Err(Error::invalid_state("cannot remove the root directory"));
        }
        self.services
            .directories
            .remove_entry(&self.parent_path, &self.name, options.recursive)
            .await
    }

    /// Immediate children as (name, handle). The listing is read when the
    /// stream is first polled and reflects the namespace at that moment.
    pub fn entries(&self) -> EntryStream<(String, Handle)> {
        self.listing(|name, handle| (name, handle))
    }

    pub fn keys(&self) -> EntryStream<String> {
        self.listing(|name, _| name)
    }

    pub fn values(&self) -> EntryStream<Handle> {
        self.listing(|_, handle| handle)
    }

    fn listing<T, F>(&self, pick: F) -> EntryStream<T>
    where
        T: Send + 'static,
        F: Fn(String, Handle) -> T + Send + 'static,
    {
        let dir = self.clone();
        Box::pin(async_stream::stream! {
            match dir.services.directories.list_children(&dir).await {
                Ok(children) => {
                    for (name, handle) in children {
                        yield Ok(pick(name, handle));
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }

    /// Path segments leading from this directory to `other`, or `None`
    /// when `other` is not inside it
    pub fn resolve(&self, other: &Handle) -> Option<Vec<String>> {
        DirectoryService::resolve_relative_path(self, other)
    }

    pub fn is_same_entry(&self, other: &Handle) -> bool {
        DirectoryService::is_same_entry(&Handle::Directory(self.clone()), other)
    }

    /// Walk `relative`, creating missing directories along the way
    pub async fn ensure_directory(&self, relative: &str) -> Result<DirectoryHandle> {
        self.services.directories.ensure_directory(self, relative).await
    }

    /// Parent directory; the root is its own parent
    pub async fn get_parent(&self) -> Result<DirectoryHandle> {
        if self.is_root() {
            return Ok(self.clone());
        }
        self.services
            .directories
            .directory_at(&self.parent_path, self.services.clone())
            .await
    }

    pub fn query_permission(&self, _mode: PermissionMode) -> PermissionState {
        PermissionState::Granted
    }

    pub async fn request_permission(&self, _mode: PermissionMode) -> PermissionState {
        PermissionState::Granted
    }
}

impl std::fmt::Debug for DirectoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryHandle")
            .field("path", &self.path)
            .finish()
    }
}
