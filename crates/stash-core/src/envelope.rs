//! Envelope codec.
//!
//! Every managed value is persisted as a single string: a JSON record
//! `{"data":<json>,"createdAt":<int ms>,"expiresAt":<int ms>?}` with
//! every literal quote replaced by the two-character sentinel `^^`,
//! because the header-channel backend cannot store quote characters.
//!
//! Detection of a managed value is a substring sniff for the
//! sentinel-wrapped `createdAt` marker. This heuristic is deliberate:
//! it lets the store coexist with pre-existing keys written by other
//! code, which decode as plain strings instead of failing. The cost is
//! that a stored string value containing a literal `^^` will not
//! survive the round trip; do not tighten the format without
//! accounting for those unmanaged keys.
//!
//! Expiration is *not* checked here; the codec only reports
//! `expires_at` and the store decides.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StashError};

/// Two-character stand-in for the quote character.
const QUOTE_SENTINEL: &str = "^^";

/// Substring that marks a raw string as a managed envelope.
const ENVELOPE_MARKER: &str = "^^createdAt^^";

/// The unit persisted per key: the caller's value plus write-time
/// metadata. Immutable once written; updates replace it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// The caller's value, opaque to the codec.
    pub data: serde_json::Value,

    /// Write timestamp, milliseconds since epoch.
    pub created_at: i64,

    /// Absolute expiration time; absent means never expires. Always
    /// `created_at + ttl_ms` computed at write time, never later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Outcome of decoding a raw backend string.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A managed envelope written by this codec.
    Envelope(Envelope),

    /// A pre-existing value written by something else, returned
    /// verbatim.
    Raw(String),
}

/// Encode a value into the envelope string format.
///
/// `expires_at` is computed here, once, from `created_at + ttl_ms`.
///
/// # Errors
///
/// Returns `StashError::Encode` only if the value cannot be
/// serialized.
pub fn encode(
    value: &serde_json::Value,
    created_at: i64,
    ttl_ms: Option<i64>,
) -> Result<String> {
    let envelope = Envelope {
        data: value.clone(),
        created_at,
        expires_at: ttl_ms.map(|ttl| created_at + ttl),
    };
    let json = serde_json::to_string(&envelope)?;
    Ok(json.replace('"', QUOTE_SENTINEL))
}

/// Decode a raw backend string.
///
/// Strings carrying the envelope marker are parsed as envelopes;
/// anything else is handed back as [`Decoded::Raw`].
///
/// # Errors
///
/// Returns `StashError::Decode` if the marker is present but the
/// restored JSON does not parse as an envelope.
pub fn decode(raw: &str) -> Result<Decoded> {
    if !raw.contains(ENVELOPE_MARKER) {
        return Ok(Decoded::Raw(raw.to_string()));
    }
    let json = raw.replace(QUOTE_SENTINEL, "\"");
    let envelope: Envelope = serde_json::from_str(&json)
        .map_err(|e| StashError::Decode(format!("Invalid envelope: {}", e)))?;
    Ok(Decoded::Envelope(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_has_no_quotes() {
        let raw = encode(&json!({"name": "alice"}), 1_000, None).unwrap();
        assert!(!raw.contains('"'));
        assert!(raw.contains(ENVELOPE_MARKER));
    }

    #[test]
    fn test_round_trip_without_ttl() {
        let value = json!({"a": 1, "b": [true, null, "x"]});
        let raw = encode(&value, 42, None).unwrap();

        match decode(&raw).unwrap() {
            Decoded::Envelope(env) => {
                assert_eq!(env.data, value);
                assert_eq!(env.created_at, 42);
                assert_eq!(env.expires_at, None);
            }
            Decoded::Raw(_) => panic!("expected envelope"),
        }
    }

    #[test]
    fn test_ttl_is_absolute_from_created_at() {
        let raw = encode(&json!("v"), 1_000, Some(250)).unwrap();
        match decode(&raw).unwrap() {
            Decoded::Envelope(env) => assert_eq!(env.expires_at, Some(1_250)),
            Decoded::Raw(_) => panic!("expected envelope"),
        }
    }

    #[test]
    fn test_unmanaged_string_is_raw() {
        match decode("just some legacy value").unwrap() {
            Decoded::Raw(s) => assert_eq!(s, "just some legacy value"),
            Decoded::Envelope(_) => panic!("expected raw"),
        }
    }

    #[test]
    fn test_marker_with_garbage_is_decode_error() {
        let raw = format!("{}not-json", ENVELOPE_MARKER);
        assert!(matches!(decode(&raw), Err(StashError::Decode(_))));
    }

    #[test]
    fn test_null_data_round_trips() {
        let raw = encode(&serde_json::Value::Null, 7, None).unwrap();
        match decode(&raw).unwrap() {
            Decoded::Envelope(env) => assert!(env.data.is_null()),
            Decoded::Raw(_) => panic!("expected envelope"),
        }
    }

    #[test]
    fn test_quotes_inside_values_survive() {
        let value = json!({"quote": "she said \"hi\""});
        let raw = encode(&value, 9, None).unwrap();
        match decode(&raw).unwrap() {
            Decoded::Envelope(env) => assert_eq!(env.data, value),
            Decoded::Raw(_) => panic!("expected envelope"),
        }
    }
}
