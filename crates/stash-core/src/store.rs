//! The core store.
//!
//! [`Stash`] fronts the four backing stores behind one API and layers
//! on what none of them provide natively: per-entry expiration,
//! namespace-scoped bulk clearing, single-level undo, and automatic
//! degradation to an in-memory map (or the cookie store) when the
//! preferred backend is unavailable.
//!
//! Backend resolution is re-derived on every call from the fixed
//! availability flags; nothing about the mapping is cached between
//! operations. All operations are synchronous and run to completion;
//! callers in multi-threaded hosts must serialize access externally.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{
    Backend, BackendKind, CookieJar, CookieOptions, MemoryBackend, SqliteBackend,
};
use crate::config::StashConfig;
use crate::envelope::{self, Decoded};
use crate::error::{Result, StashError};
use crate::key;

/// Unified key/value persistence facade.
///
/// Owns the concrete backing stores, the two independent fallback maps
/// (durable-fallback and session-fallback never share state), the
/// cookie jar, and the undo-slot table. The undo-slot namespace
/// (`_undo_*`) belongs exclusively to the store; callers must not
/// write keys colliding with it.
pub struct Stash {
    config: StashConfig,
    durable: Option<SqliteBackend>,
    session: Option<SqliteBackend>,
    memory: MemoryBackend,
    local_fallback: MemoryBackend,
    session_fallback: MemoryBackend,
    cookies: CookieJar,
    undo_slots: HashMap<String, Value>,
}

impl Stash {
    /// Construct a store from its configuration.
    ///
    /// Opens the durable store (file-backed at `durable_path`, else in
    /// memory) when `supports_local`, and the session store when
    /// `supports_session`. Before returning, runs one expiration sweep
    /// each over the durable and session stores per the
    /// `clear_expired_on_init_*` flags; the store is not ready until
    /// those complete.
    ///
    /// # Errors
    ///
    /// Returns `StashError::Storage` if a SQLite store cannot be
    /// opened or an init sweep fails.
    pub fn new(config: StashConfig) -> Result<Self> {
        let durable = if config.supports_local {
            Some(match &config.durable_path {
                Some(path) => SqliteBackend::open(path)?,
                None => SqliteBackend::open_in_memory()?,
            })
        } else {
            None
        };
        let session = if config.supports_session {
            Some(SqliteBackend::open_in_memory()?)
        } else {
            None
        };

        let mut stash = Self {
            config,
            durable,
            session,
            memory: MemoryBackend::new(),
            local_fallback: MemoryBackend::new(),
            session_fallback: MemoryBackend::new(),
            cookies: CookieJar::new(),
            undo_slots: HashMap::new(),
        };

        if stash.config.clear_expired_on_init_local {
            stash.sweep_expired(BackendKind::Local)?;
        }
        if stash.config.clear_expired_on_init_session {
            stash.sweep_expired(BackendKind::Session)?;
        }
        Ok(stash)
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    // --- Core operations ---

    /// Store a value under a key, optionally expiring after `ttl_ms`
    /// milliseconds.
    ///
    /// An explicit JSON null is a delete-then-write: the existing key
    /// is removed first, and an envelope with null data is still
    /// written afterwards. On the non-cookie route an expiration sweep
    /// runs over the target store before the write.
    ///
    /// Returns `Ok(false)` (not an error) when the value cannot be
    /// encoded. Backend-level failures such as quota exhaustion
    /// propagate untouched; the store makes no retry or eviction
    /// decision.
    pub fn set_item(
        &mut self,
        key: &str,
        value: &Value,
        kind: Option<BackendKind>,
        ttl_ms: Option<i64>,
    ) -> Result<bool> {
        let kind = self.kind_or_default(kind);
        let key = key::normalize(key);
        self.set_normalized(&key, value, kind, ttl_ms)
    }

    fn set_normalized(
        &mut self,
        key: &str,
        value: &Value,
        kind: BackendKind,
        ttl_ms: Option<i64>,
    ) -> Result<bool> {
        self.capture_undo(key, kind)?;

        if value.is_null() {
            self.remove_normalized(key, kind)?;
        }

        let raw = match envelope::encode(value, now_ms(), ttl_ms) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, %err, "stash.set encode failed");
                return Ok(false);
            }
        };

        if self.use_cookie(kind) {
            self.cookies.write(key, &raw, &CookieOptions::default());
        } else {
            // Housekeeping before the write; overflow handling beyond
            // this is the caller's problem.
            self.sweep_expired(kind)?;
            self.backend_mut(kind)?.set(key, &raw)?;
        }
        debug!(key, kind = %kind, ttl_ms, "stash.set");
        Ok(true)
    }

    /// Retrieve the value for a key, `None` if absent or expired.
    ///
    /// Reading an expired entry deletes it as a side effect. A raw
    /// string that predates or bypasses the envelope codec is returned
    /// verbatim as a JSON string. A stored null reads as absent,
    /// indistinguishable from a key never set.
    pub fn get_item(&mut self, key: &str, kind: Option<BackendKind>) -> Result<Option<Value>> {
        let kind = self.kind_or_default(kind);
        let key = key::normalize(key);
        self.get_normalized(&key, kind)
    }

    fn get_normalized(&mut self, key: &str, kind: BackendKind) -> Result<Option<Value>> {
        let raw = if self.use_cookie(kind) {
            self.cookies.read(key)
        } else {
            self.backend_ref(kind)?.get(key)?
        };
        let Some(raw) = raw else {
            return Ok(None);
        };

        match envelope::decode(&raw)? {
            Decoded::Raw(s) => Ok(Some(Value::String(s))),
            Decoded::Envelope(env) => {
                if let Some(expires_at) = env.expires_at {
                    if now_ms() > expires_at {
                        debug!(key, kind = %kind, "stash.get expired entry reaped");
                        self.remove_normalized(key, kind)?;
                        return Ok(None);
                    }
                }
                if env.data.is_null() {
                    return Ok(None);
                }
                Ok(Some(env.data))
            }
        }
    }

    /// The key at ordinal position `index` in the target store's
    /// native enumeration order. The order is not guaranteed stable
    /// across mutations.
    ///
    /// # Errors
    ///
    /// `StashError::Unsupported` for the cookie store, which has no
    /// enumeration.
    pub fn key_at(&self, index: usize, kind: Option<BackendKind>) -> Result<Option<String>> {
        let kind = self.kind_or_default(kind);
        self.backend_ref(kind)?.key_at(index)
    }

    /// Number of entries in the target store.
    ///
    /// # Errors
    ///
    /// `StashError::Unsupported` for the cookie store.
    pub fn len(&self, kind: Option<BackendKind>) -> Result<usize> {
        let kind = self.kind_or_default(kind);
        self.backend_ref(kind)?.len()
    }

    /// Delete a key from the target store; absence is not an error.
    ///
    /// On the cookie route the entry is erased by writing an empty
    /// value with an immediate expiry; that channel offers no stricter
    /// deletion contract.
    pub fn remove_item(&mut self, key: &str, kind: Option<BackendKind>) -> Result<()> {
        let kind = self.kind_or_default(kind);
        let key = key::normalize(key);
        self.remove_normalized(&key, kind)
    }

    fn remove_normalized(&mut self, key: &str, kind: BackendKind) -> Result<()> {
        if self.use_cookie(kind) {
            self.cookies.erase(key);
        } else {
            self.backend_mut(kind)?.remove(key)?;
        }
        debug!(key, kind = %kind, "stash.remove");
        Ok(())
    }

    /// Delete ALL entries in the resolved store.
    ///
    /// CAREFUL: this clears everything in the backend, not just
    /// entries written through this store — anything other code
    /// sharing the same backend has stored is lost too.
    pub fn clear(&mut self, kind: Option<BackendKind>) -> Result<()> {
        let kind = self.kind_or_default(kind);
        self.backend_mut(kind)?.clear()
    }

    /// Sweep expired entries from the target store.
    ///
    /// Walks the store in reverse ordinal order and reads every key,
    /// relying on [`get_item`](Self::get_item)'s side effect of
    /// deleting expired entries. Reverse order is required: deletion
    /// during a forward walk shifts ordinals and skips entries.
    pub fn clear_expired(&mut self, kind: Option<BackendKind>) -> Result<()> {
        let kind = self.kind_or_default(kind);
        self.sweep_expired(kind)
    }

    fn sweep_expired(&mut self, kind: BackendKind) -> Result<()> {
        let len = self.backend_ref(kind)?.len()?;
        for index in (0..len).rev() {
            if let Some(key) = self.backend_ref(kind)?.key_at(index)? {
                self.get_normalized(&key, kind)?;
            }
        }
        Ok(())
    }

    /// Remove every key whose namespace prefix matches.
    ///
    /// The namespace is normalized to end with exactly one `:`
    /// (doubled colons collapse), then matched as an exact string
    /// prefix in a reverse ordinal walk.
    pub fn clear_namespaced(
        &mut self,
        namespace: &str,
        kind: Option<BackendKind>,
    ) -> Result<()> {
        let kind = self.kind_or_default(kind);
        let prefix = format!("{}:", namespace).replace("::", ":");

        let len = self.backend_ref(kind)?.len()?;
        for index in (0..len).rev() {
            if let Some(key) = self.backend_ref(kind)?.key_at(index)? {
                if key.starts_with(&prefix) {
                    self.backend_mut(kind)?.remove(&key)?;
                }
            }
        }
        debug!(namespace = %prefix, kind = %kind, "stash.clear_namespaced");
        Ok(())
    }

    /// Whether an undo value has been captured for this key in this
    /// process. `undo_item` on a key without a slot restores absence,
    /// which deletes the key; callers wanting to guard against that
    /// check here first.
    pub fn has_undo_slot(&self, key: &str, kind: Option<BackendKind>) -> bool {
        let kind = self.kind_or_default(kind);
        let key = key::normalize(key);
        self.undo_slots.contains_key(&key::undo_slot_name(&key, kind))
    }

    /// Restore the value that existed before the most recent write to
    /// this key, returning the value now current.
    ///
    /// With undo disabled this is a plain read. With undo enabled the
    /// restore goes through `set_item`, which captures a fresh undo
    /// value — so a second undo brings back the overwritten value.
    /// Undo is a two-way swap, not a history stack.
    pub fn undo_item(&mut self, key: &str, kind: Option<BackendKind>) -> Result<Option<Value>> {
        let kind = self.kind_or_default(kind);
        let key = key::normalize(key);

        if self.config.undo_enabled {
            let slot = key::undo_slot_name(&key, kind);
            let undo_value = self.undo_slots.get(&slot).cloned().unwrap_or(Value::Null);
            debug!(key, kind = %kind, "stash.undo");
            self.set_normalized(&key, &undo_value, kind, None)?;
        }
        self.get_normalized(&key, kind)
    }

    // --- Resolution internals ---

    fn kind_or_default(&self, kind: Option<BackendKind>) -> BackendKind {
        kind.unwrap_or(self.config.default_kind)
    }

    /// Whether this call routes through the cookie store: either the
    /// kind is explicitly `Cookie`, or the requested kind is
    /// unavailable and the cookie-fallback policy is on. The cookie
    /// override takes priority over the in-memory fallback.
    fn use_cookie(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Cookie
            || (!self.kind_available(kind) && self.config.fallback_to_cookie)
    }

    fn kind_available(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Local => self.config.supports_local,
            BackendKind::Session => self.config.supports_session,
            // Neither has an availability flag, so with the cookie
            // fallback enabled these kinds route to the jar too.
            BackendKind::Memory | BackendKind::Cookie => false,
        }
    }

    fn backend_ref(&self, kind: BackendKind) -> Result<&dyn Backend> {
        match kind {
            BackendKind::Memory => Ok(&self.memory),
            BackendKind::Local => {
                if self.config.supports_local {
                    self.durable
                        .as_ref()
                        .map(|b| b as &dyn Backend)
                        .ok_or_else(|| {
                            StashError::BackendUnavailable("durable store not open".to_string())
                        })
                } else {
                    Ok(&self.local_fallback)
                }
            }
            BackendKind::Session => {
                if self.config.supports_session {
                    self.session
                        .as_ref()
                        .map(|b| b as &dyn Backend)
                        .ok_or_else(|| {
                            StashError::BackendUnavailable("session store not open".to_string())
                        })
                } else {
                    Ok(&self.session_fallback)
                }
            }
            BackendKind::Cookie => Err(StashError::Unsupported(
                "the cookie store has no enumeration interface",
            )),
        }
    }

    fn backend_mut(&mut self, kind: BackendKind) -> Result<&mut dyn Backend> {
        match kind {
            BackendKind::Memory => Ok(&mut self.memory),
            BackendKind::Local => {
                if self.config.supports_local {
                    self.durable
                        .as_mut()
                        .map(|b| b as &mut dyn Backend)
                        .ok_or_else(|| {
                            StashError::BackendUnavailable("durable store not open".to_string())
                        })
                } else {
                    Ok(&mut self.local_fallback)
                }
            }
            BackendKind::Session => {
                if self.config.supports_session {
                    self.session
                        .as_mut()
                        .map(|b| b as &mut dyn Backend)
                        .ok_or_else(|| {
                            StashError::BackendUnavailable("session store not open".to_string())
                        })
                } else {
                    Ok(&mut self.session_fallback)
                }
            }
            BackendKind::Cookie => Err(StashError::Unsupported(
                "the cookie store has no enumeration interface",
            )),
        }
    }

    fn capture_undo(&mut self, key: &str, kind: BackendKind) -> Result<()> {
        if !self.config.undo_enabled {
            return Ok(());
        }
        let current = self.get_normalized(key, kind)?.unwrap_or(Value::Null);
        self.undo_slots
            .insert(key::undo_slot_name(key, kind), current);
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// --- Convenience facade ---
//
// Fixed-backend shortcuts, pure delegation. There are none for the
// memory and cookie kinds; those are rare enough to pass explicitly.

impl Stash {
    pub fn set_local_item(&mut self, key: &str, value: &Value, ttl_ms: Option<i64>) -> Result<bool> {
        self.set_item(key, value, Some(BackendKind::Local), ttl_ms)
    }

    pub fn get_local_item(&mut self, key: &str) -> Result<Option<Value>> {
        self.get_item(key, Some(BackendKind::Local))
    }

    pub fn local_key_at(&self, index: usize) -> Result<Option<String>> {
        self.key_at(index, Some(BackendKind::Local))
    }

    pub fn local_len(&self) -> Result<usize> {
        self.len(Some(BackendKind::Local))
    }

    pub fn remove_local_item(&mut self, key: &str) -> Result<()> {
        self.remove_item(key, Some(BackendKind::Local))
    }

    pub fn clear_local(&mut self) -> Result<()> {
        self.clear(Some(BackendKind::Local))
    }

    pub fn clear_local_expired(&mut self) -> Result<()> {
        self.clear_expired(Some(BackendKind::Local))
    }

    pub fn clear_local_namespaced(&mut self, namespace: &str) -> Result<()> {
        self.clear_namespaced(namespace, Some(BackendKind::Local))
    }

    pub fn undo_local_item(&mut self, key: &str) -> Result<Option<Value>> {
        self.undo_item(key, Some(BackendKind::Local))
    }

    pub fn set_session_item(
        &mut self,
        key: &str,
        value: &Value,
        ttl_ms: Option<i64>,
    ) -> Result<bool> {
        self.set_item(key, value, Some(BackendKind::Session), ttl_ms)
    }

    pub fn get_session_item(&mut self, key: &str) -> Result<Option<Value>> {
        self.get_item(key, Some(BackendKind::Session))
    }

    pub fn session_key_at(&self, index: usize) -> Result<Option<String>> {
        self.key_at(index, Some(BackendKind::Session))
    }

    pub fn session_len(&self) -> Result<usize> {
        self.len(Some(BackendKind::Session))
    }

    pub fn remove_session_item(&mut self, key: &str) -> Result<()> {
        self.remove_item(key, Some(BackendKind::Session))
    }

    pub fn clear_session(&mut self) -> Result<()> {
        self.clear(Some(BackendKind::Session))
    }

    pub fn clear_session_expired(&mut self) -> Result<()> {
        self.clear_expired(Some(BackendKind::Session))
    }

    pub fn clear_session_namespaced(&mut self, namespace: &str) -> Result<()> {
        self.clear_namespaced(namespace, Some(BackendKind::Session))
    }

    pub fn undo_session_item(&mut self, key: &str) -> Result<Option<Value>> {
        self.undo_item(key, Some(BackendKind::Session))
    }
}
