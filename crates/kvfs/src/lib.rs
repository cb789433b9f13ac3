// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! A hierarchical filesystem stored in a key-value engine.
//!
//! Directories and files are descriptors keyed by `(parent_path, name)` in
//! one collection; file bytes live in a second collection under a random
//! file key. Handles address entries by path and re-read their descriptor
//! on every operation.
//!
//! ```no_run
//! # async fn demo() -> kvfs::Result<()> {
//! use kvfs::{CreateWritableOptions, GetHandleOptions};
//!
//! let fs = kvfs::memory::new_fs().await?;
//! let docs = fs.root().get_directory_handle("docs", GetHandleOptions::create()).await?;
//! let file = docs.get_file_handle("a.txt", GetHandleOptions::create()).await?;
//! let mut stream = file.create_writable(CreateWritableOptions::default()).await?;
//! stream.write("hi")?;
//! stream.close().await?;
//! assert_eq!(file.get_content().await?.bytes, b"hi");
//! # Ok(())
//! # }
//! ```

mod content;
mod descriptor;
mod directory;
mod error;
mod file;
mod fs;
mod handle;
mod namespace;
pub mod memory;
pub mod path;
pub mod persistence;
mod writable;

pub use content::ContentStore;
pub use descriptor::{DirectoryDescriptor, EntryDescriptor, EntryKind, EntryMetadata, FileDescriptor};
pub use directory::DirectoryService;
pub use error::{Error, Result};
pub use file::{FileContent, FileService};
pub use fs::{COLLECTION_PREFIX, FS, FSOptions};
pub use handle::{
    CreateWritableOptions, DirectoryHandle, EntryStream, FileHandle, GetHandleOptions, Handle,
    PermissionMode, PermissionState, RemoveOptions,
};
pub use namespace::NamespaceStore;
pub use persistence::{KeyRange, PersistenceLayer};
pub use writable::{CommitFuture, CommitHook, StreamState, WritableByteStream, WriteCommand, WriteData};

#[cfg(test)]
mod tests;
