//! Header-channel (cookie) store.
//!
//! A size- and count-limited key/value channel with `Set-Cookie`
//! semantics. Entries are serialized as
//! `key=value; [Expires=<GMT date>]; Path=<path|/>; [Domain=<domain>]; [secure]`;
//! session entries omit `Expires` entirely and so last only as long as
//! the jar. Reads scan the combined `k=v; k2=v2` header rendering the
//! same way a client scans `document.cookie`.
//!
//! This store offers no enumeration or count, which is why it does not
//! implement the `Backend` trait; the core store reports those
//! operations as unsupported on the cookie route.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Default time-to-live for non-session entries: 8760 hours (365
/// days).
pub const DEFAULT_TTL_HOURS: i64 = 365 * 24;

/// Attributes for a single cookie write.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Session entries carry no `Expires` and die with the jar.
    pub session: bool,

    /// Lifetime in hours for non-session entries.
    pub ttl_hours: i64,

    /// Optional `Domain` attribute.
    pub domain: Option<String>,

    /// `Path` attribute; `/` when unset.
    pub path: Option<String>,

    /// Emit the `secure` attribute.
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            session: false,
            ttl_hours: DEFAULT_TTL_HOURS,
            domain: None,
            path: None,
            secure: false,
        }
    }
}

#[derive(Debug, Clone)]
struct CookieEntry {
    name: String,
    value: String,
    /// `None` for session entries.
    expires: Option<DateTime<Utc>>,
}

/// In-process cookie jar implementing the header-channel contract:
/// `write`, `read`, `erase`.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: Vec<CookieEntry>,
}

impl CookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an entry, replacing any prior entry of the same name.
    ///
    /// Writing with an already-past expiry deletes the entry, which is
    /// how [`erase`](Self::erase) works.
    pub fn write(&mut self, key: &str, value: &str, options: &CookieOptions) {
        let now = Utc::now();
        let line = set_cookie_line(key, value, options, now);
        debug!(cookie = %line, "cookie_jar.write");

        let expires = if options.session {
            None
        } else {
            Some(now + Duration::hours(options.ttl_hours))
        };

        // Drop the prior entry for this key and compact anything
        // already dead, so erased keys do not pile up in the jar.
        self.entries
            .retain(|e| e.name != key && e.expires.map_or(true, |x| x > now));

        // A write with an already-past expiry is a deletion.
        if matches!(expires, Some(x) if x <= now) {
            return;
        }

        self.entries.push(CookieEntry {
            name: key.to_string(),
            value: value.to_string(),
            expires,
        });
    }

    /// Read the value for a key by scanning the header rendering.
    /// Expired entries read as absent.
    pub fn read(&self, key: &str) -> Option<String> {
        let needle = format!("{}=", key);
        for chunk in self.header().split(';') {
            let chunk = chunk.trim_start_matches(' ');
            if let Some(value) = chunk.strip_prefix(&needle) {
                return Some(value.to_string());
            }
        }
        None
    }

    /// Erase an entry by writing an empty value with an immediate
    /// expiry.
    pub fn erase(&mut self, key: &str) {
        self.write(
            key,
            "",
            &CookieOptions {
                ttl_hours: -1000,
                ..CookieOptions::default()
            },
        );
    }

    /// Render the live entries as a `k=v; k2=v2` header string.
    pub fn header(&self) -> String {
        let now = Utc::now();
        self.entries
            .iter()
            .filter(|e| match e.expires {
                Some(expires) => expires > now,
                None => true,
            })
            .map(|e| format!("{}={}", e.name, e.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Format one `Set-Cookie`-style line per the channel's encoding rule.
fn set_cookie_line(
    key: &str,
    value: &str,
    options: &CookieOptions,
    now: DateTime<Utc>,
) -> String {
    let mut line = format!("{}={}", key, value);
    if !options.session {
        let expires = now + Duration::hours(options.ttl_hours);
        line.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    line.push_str(&format!(
        "; Path={}",
        options.path.as_deref().unwrap_or("/")
    ));
    if let Some(domain) = &options.domain {
        line.push_str(&format!("; Domain={}", domain));
    }
    if options.secure {
        line.push_str("; secure");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_round_trip() {
        let mut jar = CookieJar::new();
        jar.write("token", "abc123", &CookieOptions::default());
        assert_eq!(jar.read("token"), Some("abc123".to_string()));
        assert_eq!(jar.read("missing"), None);
    }

    #[test]
    fn test_write_replaces_same_key() {
        let mut jar = CookieJar::new();
        jar.write("k", "one", &CookieOptions::default());
        jar.write("k", "two", &CookieOptions::default());
        assert_eq!(jar.read("k"), Some("two".to_string()));
        assert_eq!(jar.header(), "k=two");
    }

    #[test]
    fn test_erase_makes_entry_absent() {
        let mut jar = CookieJar::new();
        jar.write("gone", "v", &CookieOptions::default());
        jar.erase("gone");
        assert_eq!(jar.read("gone"), None);
        assert_eq!(jar.header(), "");
    }

    #[test]
    fn test_erase_leaves_no_residue() {
        let mut jar = CookieJar::new();
        jar.write("gone", "v", &CookieOptions::default());
        jar.erase("gone");
        assert!(jar.entries.is_empty());
    }

    #[test]
    fn test_write_compacts_dead_entries() {
        let mut jar = CookieJar::new();
        jar.write(
            "old",
            "v",
            &CookieOptions {
                ttl_hours: -1,
                ..CookieOptions::default()
            },
        );
        jar.write("live", "v", &CookieOptions::default());
        assert_eq!(jar.entries.len(), 1);
        assert_eq!(jar.header(), "live=v");
    }

    #[test]
    fn test_prefix_key_does_not_shadow() {
        let mut jar = CookieJar::new();
        jar.write("user_id", "7", &CookieOptions::default());
        assert_eq!(jar.read("user"), None);
    }

    #[test]
    fn test_session_line_omits_expires() {
        let options = CookieOptions {
            session: true,
            ..CookieOptions::default()
        };
        let line = set_cookie_line("k", "v", &options, Utc::now());
        assert_eq!(line, "k=v; Path=/");
    }

    #[test]
    fn test_line_attribute_order_and_defaults() {
        let now = Utc::now();
        let options = CookieOptions {
            session: false,
            ttl_hours: 1,
            domain: Some("example.com".to_string()),
            path: Some("/app".to_string()),
            secure: true,
        };
        let line = set_cookie_line("k", "v", &options, now);

        assert!(line.starts_with("k=v; Expires="));
        assert!(line.contains(" GMT; Path=/app; Domain=example.com; secure"));
    }

    #[test]
    fn test_default_ttl_is_one_year() {
        assert_eq!(CookieOptions::default().ttl_hours, 8760);
    }

    #[test]
    fn test_expired_entry_reads_absent() {
        let mut jar = CookieJar::new();
        jar.write(
            "old",
            "v",
            &CookieOptions {
                ttl_hours: -1,
                ..CookieOptions::default()
            },
        );
        assert_eq!(jar.read("old"), None);
    }
}
