//! Backing-store adapters.
//!
//! The `Backend` trait is the capability contract the core store
//! requires from every string-valued backing store: point reads and
//! writes plus ordinal enumeration. Four concrete stores exist —
//! durable (SQLite file), session (SQLite in memory), plain in-memory
//! map, and the header-channel cookie jar — selected by a
//! [`BackendKind`] tag rather than by probing for method shapes.
//!
//! The cookie jar deliberately does not implement `Backend`: it has no
//! enumeration or count, and the store reports those operations as
//! unsupported on that route.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod cookie;
pub mod memory;
pub mod sqlite;

pub use cookie::{CookieJar, CookieOptions};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Symbolic selector for the backing store, resolved to a concrete
/// adapter at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Durable store; survives process restarts.
    Local,
    /// Session-scoped store; lives exactly as long as the process.
    Session,
    /// Plain in-process map.
    Memory,
    /// Header-channel (cookie) store, size- and count-limited.
    Cookie,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Session => "session",
            Self::Memory => "memory",
            Self::Cookie => "cookie",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "session" => Ok(Self::Session),
            "memory" => Ok(Self::Memory),
            "cookie" => Ok(Self::Cookie),
            other => Err(format!("unknown backend kind: {}", other)),
        }
    }
}

/// Capability contract for a string-keyed, string-valued backing
/// store.
///
/// Enumeration order (`key_at`) is whatever the backend natively
/// yields and is not guaranteed stable across mutations; callers that
/// delete while iterating must walk indices in reverse.
pub trait Backend {
    /// Read the raw string for a key, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw string, overwriting any prior value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; absence is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Delete every entry, including entries written by other code
    /// sharing the store.
    fn clear(&mut self) -> Result<()>;

    /// The key at ordinal position `index`, `None` past the end.
    fn key_at(&self, index: usize) -> Result<Option<String>>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            BackendKind::Local,
            BackendKind::Session,
            BackendKind::Memory,
            BackendKind::Cookie,
        ] {
            assert_eq!(BackendKind::from_str(kind.as_str()), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(BackendKind::from_str("flash").is_err());
    }
}
