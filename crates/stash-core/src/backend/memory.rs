//! Plain in-process map backend.
//!
//! Used both as the `memory` kind proper and as the fallback stand-in
//! when the durable or session store is unavailable (two independent
//! fallback instances, one per scope). Enumeration order is the map's
//! key order, which is deterministic but shifts as keys come and go.

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::Backend;
use crate::error::Result;

/// String-keyed map backend. Infallible, but speaks the same
/// `Result`-shaped contract as the fallible adapters.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    /// Create an empty map backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        debug!(entries = self.entries.len(), "memory_backend.clear");
        self.entries.clear();
        Ok(())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.entries.keys().nth(index).cloned())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_ops() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.len().unwrap(), 0);
        assert_eq!(backend.get("k").unwrap(), None);

        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(backend.len().unwrap(), 1);

        backend.set("k", "v2").unwrap();
        assert_eq!(backend.get("k").unwrap(), Some("v2".to_string()));
        assert_eq!(backend.len().unwrap(), 1);

        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn test_remove_absent_is_ok() {
        let mut backend = MemoryBackend::new();
        backend.remove("never-set").unwrap();
    }

    #[test]
    fn test_enumeration_is_key_ordered() {
        let mut backend = MemoryBackend::new();
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();
        backend.set("c", "3").unwrap();

        assert_eq!(backend.key_at(0).unwrap(), Some("a".to_string()));
        assert_eq!(backend.key_at(1).unwrap(), Some("b".to_string()));
        assert_eq!(backend.key_at(2).unwrap(), Some("c".to_string()));
        assert_eq!(backend.key_at(3).unwrap(), None);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut backend = MemoryBackend::new();
        backend.set("a", "1").unwrap();
        backend.set("b", "2").unwrap();

        backend.clear().unwrap();
        assert_eq!(backend.len().unwrap(), 0);
        assert_eq!(backend.key_at(0).unwrap(), None);
    }
}
