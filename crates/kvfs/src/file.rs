// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::content::ContentStore;
use crate::descriptor::{EntryDescriptor, EntryKind, EntryMetadata, FileDescriptor, now_millis};
use crate::error::{Error, Result};
use crate::handle::{CreateWritableOptions, FileHandle, Handle};
use crate::namespace::NamespaceStore;
use crate::path;
use crate::writable::{CommitFuture, CommitHook, WritableByteStream};
use diagnostics::{debug, warn};
use std::sync::Arc;

/// The bytes of a file together with its modification time
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    pub name: String,
    pub bytes: Vec<u8>,
    pub last_modified_time: i64,
}

impl FileContent {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// File content operations: read, write streams, removal, identity
#[derive(Clone)]
pub struct FileService {
    namespace: NamespaceStore,
    content: ContentStore,
}

impl FileService {
    pub fn new(namespace: NamespaceStore, content: ContentStore) -> Self {
        Self { namespace, content }
    }

    /// Current descriptor for the file at (parent_path, name). A missing
    /// entry, or one that is not a file, is `NotFound`.
    async fn descriptor(&self, parent_path: &str, name: &str) -> Result<FileDescriptor> {
        match self.namespace.get(parent_path, name).await? {
            Some(EntryDescriptor::File(file)) => Ok(file),
            Some(EntryDescriptor::Directory(_)) | None => {
                Err(Error::not_found(path::join(parent_path, name)))
            }
        }
    }

    /// Current descriptor and content, from a single descriptor read. A
    /// descriptor whose content blob is gone is deleted before reporting
    /// `NotFound`.
    async fn snapshot(&self, file: &FileHandle) -> Result<(FileDescriptor, Vec<u8>)> {
        let descriptor = self.descriptor(file.parent_path(), file.name()).await?;
        match self.content.get(&descriptor.file_key).await? {
            Some(bytes) => Ok((descriptor, bytes)),
            None => {
                let entry_path = file.path();
                warn!(
                    "removing {path}: content {file_key} is missing",
                    path: entry_path.as_str(),
                    file_key: descriptor.file_key.as_str()
                );
                self.namespace
                    .delete(&descriptor.parent_path, &descriptor.name)
                    .await?;
                Err(Error::not_found(entry_path))
            }
        }
    }

    /// Read the whole file
    pub async fn read_all(&self, file: &FileHandle) -> Result<FileContent> {
        let (descriptor, bytes) = self.snapshot(file).await?;
        Ok(FileContent {
            name: descriptor.name,
            bytes,
            last_modified_time: descriptor.last_modified_time,
        })
    }

    /// Open a writable stream, seeded with the current content when
    /// `keep_existing_data` is set.
    pub async fn open_writable(
        &self,
        file: &FileHandle,
        options: CreateWritableOptions,
    ) -> Result<WritableByteStream> {
        let initial = if options.keep_existing_data {
            self.read_all(file).await?.bytes
        } else {
            _ = self.descriptor(file.parent_path(), file.name()).await?;
            Vec::new()
        };

        let service = self.clone();
        let parent_path = file.parent_path().to_string();
        let name = file.name().to_string();
        let on_close: CommitHook = Arc::new(move |buffer: Vec<u8>| {
            let service = service.clone();
            let parent_path = parent_path.clone();
            let name = name.clone();
            Box::pin(async move { service.commit(&parent_path, &name, buffer).await })
                as CommitFuture
        });

        Ok(WritableByteStream::new(initial, on_close))
    }

    /// Persist a closed stream's buffer. The descriptor is fetched again
    /// here because the entry may have been deleted and recreated under a
    /// new file key since the stream was opened.
    async fn commit(&self, parent_path: &str, name: &str, buffer: Vec<u8>) -> Result<()> {
        let mut descriptor = self.descriptor(parent_path, name).await?;
        let size = buffer.len();
        self.content.put(&descriptor.file_key, buffer).await?;
        debug!(
            "committed {size} bytes to {file_key}",
            size: size,
            file_key: descriptor.file_key.as_str()
        );

        descriptor.last_modified_time = now_millis();
        self.namespace.put(&EntryDescriptor::File(descriptor)).await?;
        Ok(())
    }

    /// Remove the descriptor, then its content
    pub async fn remove(&self, file: &FileHandle) -> Result<()> {
        let descriptor = self.descriptor(file.parent_path(), file.name()).await?;
        self.namespace
            .delete(&descriptor.parent_path, &descriptor.name)
            .await?;
        self.content.delete(&descriptor.file_key).await?;
        debug!("removed file {path}", path: file.path());
        Ok(())
    }

    /// Two handles name the same file only if both currently resolve to
    /// descriptors in the same directory with the same file key, and that
    /// key is the one each handle observed when it was obtained. A handle
    /// that outlived a delete/recreate of its path is not the same entry.
    pub async fn is_same_entry(&self, a: &Handle, b: &Handle) -> Result<bool> {
        let (Handle::File(a), Handle::File(b)) = (a, b) else {
            return Ok(false);
        };
        if a.parent_path() != b.parent_path() {
            return Ok(false);
        }
        let (Some(ka), Some(kb)) = (self.current_key(a).await?, self.current_key(b).await?)
        else {
            return Ok(false);
        };
        Ok(ka == kb && a.observed_key() == ka && b.observed_key() == kb)
    }

    async fn current_key(&self, file: &FileHandle) -> Result<Option<String>> {
        Ok(self
            .namespace
            .get(file.parent_path(), file.name())
            .await?
            .and_then(|d| d.file_key().map(str::to_string)))
    }

    pub async fn metadata(&self, file: &FileHandle) -> Result<EntryMetadata> {
        let (descriptor, bytes) = self.snapshot(file).await?;
        Ok(EntryMetadata {
            kind: EntryKind::File,
            create_time: descriptor.create_time,
            last_modified_time: descriptor.last_modified_time,
            size: bytes.len() as u64,
        })
    }
}
