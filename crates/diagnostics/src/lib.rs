// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging facade for the kvfs workspace
//!
//! Output goes to stderr through `emit_term` and is controlled by the
//! `KVFS_LOG` environment variable:
//! - `KVFS_LOG=off` (default): no logs
//! - `KVFS_LOG=error|warn|info|debug`: that level and above
//!
//! Libraries only use the macros; binaries and tests call [`init`] once.

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable holding the log level
pub const LOG_ENV: &str = "KVFS_LOG";

static INIT: Once = Once::new();

/// Minimum level for a `KVFS_LOG` value. `None` disables logging.
pub fn parse_level(value: &str) -> Result<Option<emit::Level>, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Ok(None),
        "error" => Ok(Some(emit::Level::Error)),
        "warn" => Ok(Some(emit::Level::Warn)),
        "info" => Ok(Some(emit::Level::Info)),
        "debug" => Ok(Some(emit::Level::Debug)),
        other => Err(other.to_string()),
    }
}

/// Initialize logging from `KVFS_LOG`. Calls after the first are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_default();
        let (level, unknown) = match parse_level(&value) {
            Ok(None) => return,
            Ok(Some(level)) => (level, None),
            Err(unknown) => (emit::Level::Info, Some(unknown)),
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();
        if let Some(unknown) = unknown {
            emit::warn!("unknown {var} value {value}, using info", var: LOG_ENV, value: unknown.as_str());
        }

        // The runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

/// Log basic operations: opening an instance, bulk removals
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed steps: entry creation and removal, stream commits
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems, such as repairs made while reading
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
