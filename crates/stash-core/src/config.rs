//! Process-wide configuration.
//!
//! One explicit object constructed at startup and handed to
//! [`Stash::new`](crate::Stash::new); there is no ambient global
//! state, so tests can run independent stores side by side.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;

/// Configuration for a [`Stash`](crate::Stash) instance, fixed for its
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Route calls through the cookie store when the requested backend
    /// is unavailable (instead of the in-memory fallback map).
    pub fallback_to_cookie: bool,

    /// Sweep expired entries from the durable store at construction.
    pub clear_expired_on_init_local: bool,

    /// Sweep expired entries from the session store at construction.
    pub clear_expired_on_init_session: bool,

    /// Capture pre-write values so `undo_item` can restore them.
    pub undo_enabled: bool,

    /// Backend used when an operation does not name one.
    pub default_kind: BackendKind,

    /// Whether the durable store is available. Capability detection is
    /// an input here, not something the store probes for.
    pub supports_local: bool,

    /// Whether the session store is available.
    pub supports_session: bool,

    /// Where the durable SQLite file lives; `None` keeps it in memory
    /// (useful in tests).
    pub durable_path: Option<PathBuf>,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            fallback_to_cookie: false,
            clear_expired_on_init_local: true,
            clear_expired_on_init_session: true,
            undo_enabled: false,
            default_kind: BackendKind::Session,
            supports_local: true,
            supports_session: true,
            durable_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let config = StashConfig::default();
        assert!(!config.fallback_to_cookie);
        assert!(config.clear_expired_on_init_local);
        assert!(config.clear_expired_on_init_session);
        assert!(!config.undo_enabled);
        assert_eq!(config.default_kind, BackendKind::Session);
        assert!(config.supports_local);
        assert!(config.supports_session);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: StashConfig =
            serde_json::from_str(r#"{"default_kind": "local", "undo_enabled": true}"#).unwrap();
        assert_eq!(config.default_kind, BackendKind::Local);
        assert!(config.undo_enabled);
        assert!(config.supports_session);
    }
}
