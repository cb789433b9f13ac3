// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Kind of a namespace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// Persisted record for a file. `file_key` names its content blob and is
/// independent of the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub parent_path: String,
    pub create_time: i64,
    pub last_modified_time: i64,
    pub file_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryDescriptor {
    pub name: String,
    pub parent_path: String,
    pub create_time: i64,
    pub last_modified_time: i64,
}

/// One descriptor per namespace entry, keyed by (parent_path, name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryDescriptor {
    File(FileDescriptor),
    Directory(DirectoryDescriptor),
}

/// Metadata reported for an entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMetadata {
    pub kind: EntryKind,
    pub create_time: i64,
    pub last_modified_time: i64,
    pub size: u64,
}

/// Current time as Unix milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl EntryDescriptor {
    pub fn new_file(parent_path: &str, name: &str, file_key: String) -> Self {
        let now = now_millis();
        EntryDescriptor::File(FileDescriptor {
            name: name.to_string(),
            parent_path: parent_path.to_string(),
            create_time: now,
            last_modified_time: now,
            file_key,
        })
    }

    pub fn new_directory(parent_path: &str, name: &str) -> Self {
        let now = now_millis();
        EntryDescriptor::Directory(DirectoryDescriptor {
            name: name.to_string(),
            parent_path: parent_path.to_string(),
            create_time: now,
            last_modified_time: now,
        })
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            EntryDescriptor::File(_) => EntryKind::File,
            EntryDescriptor::Directory(_) => EntryKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntryDescriptor::File(f) => &f.name,
            EntryDescriptor::Directory(d) => &d.name,
        }
    }

    pub fn parent_path(&self) -> &str {
        match self {
            EntryDescriptor::File(f) => &f.parent_path,
            EntryDescriptor::Directory(d) => &d.parent_path,
        }
    }

    /// Absolute path of this entry
    pub fn path(&self) -> String {
        crate::path::join(self.parent_path(), self.name())
    }

    pub fn create_time(&self) -> i64 {
        match self {
            EntryDescriptor::File(f) => f.create_time,
            EntryDescriptor::Directory(d) => d.create_time,
        }
    }

    pub fn last_modified_time(&self) -> i64 {
        match self {
            EntryDescriptor::File(f) => f.last_modified_time,
            EntryDescriptor::Directory(d) => d.last_modified_time,
        }
    }

    pub fn as_file(&self) -> Option<&FileDescriptor> {
        match self {
            EntryDescriptor::File(f) => Some(f),
            EntryDescriptor::Directory(_) => None,
        }
    }

    pub fn file_key(&self) -> Option<&str> {
        self.as_file().map(|f| f.file_key.as_str())
    }
}
