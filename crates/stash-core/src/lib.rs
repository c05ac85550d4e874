//! # Stash Core
//!
//! Core library for stash - a unified key/value persistence facade
//! over durable, session-scoped, in-memory, and cookie-style backing
//! stores.
//!
//! On top of whichever backend a call resolves to, the facade adds
//! per-entry expiration, namespace-scoped bulk clearing, single-level
//! undo, and automatic degradation to an in-memory map (or the cookie
//! store) when the preferred backend is unavailable.
//!
//! ## Architecture
//!
//! - **envelope**: codec wrapping values with timestamp/expiration
//!   metadata in a quote-free string format
//! - **key**: key normalization and undo-slot naming
//! - **backend**: the capability trait and the four concrete adapters
//! - **config**: the explicit, injected configuration object
//! - **store**: the [`Stash`] facade itself

pub mod backend;
pub mod config;
pub mod envelope;
pub mod error;
pub mod key;
pub mod store;

pub use backend::{Backend, BackendKind, CookieJar, CookieOptions, MemoryBackend, SqliteBackend};
pub use config::StashConfig;
pub use envelope::{Decoded, Envelope};
pub use error::{Result, StashError};
pub use store::Stash;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
