// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::descriptor::EntryKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur in filesystem operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Type mismatch: {path} is not a {expected}")]
    TypeMismatch { path: String, expected: EntryKind },

    #[error("Entry already exists: {0}")]
    EntryExists(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Failure reported by the underlying key-value engine
    #[error("Storage engine error: {0}")]
    Engine(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn invalid_path<S: AsRef<str>>(path: S) -> Self {
        Error::InvalidPath(path.as_ref().to_string())
    }

    pub fn invalid_name<S: AsRef<str>>(name: S) -> Self {
        Error::InvalidName(name.as_ref().to_string())
    }

    pub fn not_found<S: AsRef<str>>(path: S) -> Self {
        Error::NotFound(path.as_ref().to_string())
    }

    pub fn type_mismatch<S: AsRef<str>>(path: S, expected: EntryKind) -> Self {
        Error::TypeMismatch {
            path: path.as_ref().to_string(),
            expected,
        }
    }

    pub fn entry_exists<S: AsRef<str>>(path: S) -> Self {
        Error::EntryExists(path.as_ref().to_string())
    }

    pub fn directory_not_empty<S: AsRef<str>>(path: S) -> Self {
        Error::DirectoryNotEmpty(path.as_ref().to_string())
    }

    pub fn not_supported<S: AsRef<str>>(what: S) -> Self {
        Error::NotSupported(what.as_ref().to_string())
    }

    pub fn invalid_state<S: AsRef<str>>(msg: S) -> Self {
        Error::InvalidState(msg.as_ref().to_string())
    }

    pub fn engine<S: AsRef<str>>(msg: S) -> Self {
        Error::Engine(msg.as_ref().to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> std::io::Error {
        match err {
            Error::NotFound(_) => std::io::Error::new(std::io::ErrorKind::NotFound, err),
            Error::EntryExists(_) => std::io::Error::new(std::io::ErrorKind::AlreadyExists, err),
            Error::InvalidPath(_) | Error::InvalidName(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            _ => std::io::Error::other(err),
        }
    }
}
