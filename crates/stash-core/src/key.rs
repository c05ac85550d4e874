//! Key name handling.
//!
//! External key names are normalized before they touch a backend, and
//! internal bookkeeping names (undo slots) are derived here so the
//! reserved prefix lives in one place.

use crate::backend::BackendKind;

/// Prefix reserved for undo bookkeeping. Callers must not write keys
/// that collide with it.
pub const UNDO_PREFIX: &str = "_undo_";

/// Normalize an external key name by stripping space characters.
///
/// Only U+0020 is removed; other whitespace passes through. This is a
/// defined narrowing, not a general trim or sanitize.
pub fn normalize(key: &str) -> String {
    key.replace(' ', "")
}

/// Derive the undo-slot name for a `(key, kind)` pair.
pub fn undo_slot_name(key: &str, kind: BackendKind) -> String {
    format!("{}{}_{}", UNDO_PREFIX, kind.as_str(), key)
}
