// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Memory-based persistence for kvfs
//!
//! `MemoryPersistence` keeps every collection in a `BTreeMap`, which gives the
//! sorted range scans the namespace layout depends on. It is used by the test
//! suite and by embedders that do not need durability.

mod persistence;

pub use persistence::MemoryPersistence;

use crate::error::Result;
use crate::fs::{FS, FSOptions};

/// Open a default-named filesystem over a fresh in-memory engine
pub async fn new_fs() -> Result<FS> {
    FS::open(MemoryPersistence::default(), FSOptions::default()).await
}
