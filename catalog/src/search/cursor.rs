//! Cursor encoding for cursor-based pagination: opaque strings that
//! encode `(last_sort_tuple, last_id)`, valid only for the same
//! filter+sort fingerprint (§4.9).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursor {
    pub fingerprint: String,
    pub last_sort_value: String,
    pub last_id: Uuid,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Fails fast on malformed cursors or cursors minted under a
    /// different filter+sort fingerprint.
    pub fn decode(raw: &str, expected_fingerprint: &str) -> Result<Self, String> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| "cursor is not valid base64".to_string())?;
        let cursor: Cursor = serde_json::from_slice(&bytes).map_err(|_| "cursor payload is malformed".to_string())?;
        if cursor.fingerprint != expected_fingerprint {
            return Err("cursor was minted for a different filter/sort combination".to_string());
        }
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let cursor = Cursor {
            fingerprint: "abc".to_string(),
            last_sort_value: "Цемент".to_string(),
            last_id: Uuid::new_v4(),
        };
        let encoded = cursor.encode();
        let decoded = Cursor::decode(&encoded, "abc").unwrap();
        assert_eq!(decoded.last_id, cursor.last_id);
    }

    #[test]
    fn rejects_mismatched_fingerprint() {
        let cursor = Cursor {
            fingerprint: "abc".to_string(),
            last_sort_value: "x".to_string(),
            last_id: Uuid::new_v4(),
        };
        let encoded = cursor.encode();
        assert!(Cursor::decode(&encoded, "different").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Cursor::decode("not-a-cursor!!", "abc").is_err());
    }
}
