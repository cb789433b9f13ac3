// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path normalization and entry name validation.
//!
//! Paths here are virtual keys, not host paths: they always use `/` and are
//! normalized to an absolute form with no `.`/`..` segments and no trailing
//! separator (except the root itself).

use crate::error::{Error, Result};

pub const SEPARATOR: char = '/';
pub const ROOT: &str = "/";

/// Longest accepted entry name, in characters
pub const MAX_NAME_LEN: usize = 255;

const BLACKLIST: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const RESERVED_NAMES: &[&str] = &["CON", "PRN", "AUX", "NUL", "CLOCK$"];
const RESERVED_NUMBERED: &[&str] = &["COM", "LPT"];

/// Resolve `input` against `base` into a normalized absolute path.
///
/// Relative inputs are appended to `base`. `.` segments and empty segments
/// are dropped, `..` pops the previous segment. Ascending past the root
/// fails with `InvalidPath`.
pub fn resolve(base: &str, input: &str) -> Result<String> {
    let joined;
    let full = if input.starts_with(SEPARATOR) {
        input
    } else {
        joined = format!("{base}{SEPARATOR}{input}");
        joined.as_str()
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in full.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::invalid_path(input));
                }
            }
            _ => parts.push(part),
        }
    }

    Ok(format!("{SEPARATOR}{}", parts.join(ROOT)))
}

/// Check that `name` can be used as a file or directory name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with(char::is_whitespace)
        || name.chars().count() > MAX_NAME_LEN
        || name.chars().any(|c| BLACKLIST.contains(&c) || c.is_control())
        || name.ends_with('.')
        || name.ends_with(' ')
        || name.contains("..")
        || is_reserved(name)
    {
        return Err(Error::invalid_name(name));
    }
    Ok(())
}

/// Device names are reserved case-insensitively, with or without an extension.
fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_ascii_uppercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return true;
    }
    RESERVED_NUMBERED.iter().any(|prefix| {
        stem.len() == prefix.len() + 1
            && stem.starts_with(prefix)
            && stem.as_bytes()[prefix.len()].is_ascii_digit()
    })
}

pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Join a normalized parent path and a validated name
pub fn join(parent: &str, name: &str) -> String {
    if is_root(parent) {
        format!("{SEPARATOR}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Split a normalized absolute path into (parent path, name).
/// Returns `None` for the root.
pub fn split(path: &str) -> Option<(String, String)> {
    if is_root(path) {
        return None;
    }
    let idx = path.rfind(SEPARATOR)?;
    let parent = if idx == 0 { ROOT } else { &path[..idx] };
    Some((parent.to_string(), path[idx + 1..].to_string()))
}

/// Non-empty segments of a normalized path
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Number of segments below the root; the root itself has depth 0
pub fn depth(path: &str) -> usize {
    segments(path).len()
}

/// Segments leading from `ancestor` down to `descendant`, if `descendant`
/// lies under `ancestor` at a segment boundary.
pub fn relative_segments(ancestor: &str, descendant: &str) -> Option<Vec<String>> {
    let from = segments(ancestor);
    let to = segments(descendant);
    if to.len() < from.len() || from.iter().zip(&to).any(|(a, b)| a != b) {
        return None;
    }
    Some(to[from.len()..].iter().map(|s| s.to_string()).collect())
}
