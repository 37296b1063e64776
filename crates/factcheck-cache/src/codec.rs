//! Versioned serialization boundary.
//!
//! Every value, tier record and backup snapshot is framed as one format
//! version byte followed by a MessagePack body with named fields.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// Current frame version.
pub const FORMAT_VERSION: u8 = 1;

/// Encode `value` into a framed byte vector.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    let body = rmp_serde::to_vec_named(value)
        .map_err(|e| CacheError::serialization(format!("encode failed: {e}")))?;
    let mut framed = Vec::with_capacity(body.len() + 1);
    framed.push(FORMAT_VERSION);
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Decode a framed byte slice produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    let (version, body) = bytes
        .split_first()
        .ok_or_else(|| CacheError::serialization("empty payload"))?;
    if *version != FORMAT_VERSION {
        return Err(CacheError::serialization(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    rmp_serde::from_slice(body).map_err(|e| CacheError::serialization(format!("decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serializer};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Verdict {
        claim_id: u64,
        status: String,
        confidence: f32,
        sources: Vec<String>,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("model handle cannot be cached"))
        }
    }

    #[test]
    fn test_struct_is_lossless() {
        let verdict = Verdict {
            claim_id: 123,
            status: "VERIFIED".into(),
            confidence: 0.875,
            sources: vec!["reuters".into(), "afp".into()],
        };
        let bytes = encode(&verdict).unwrap();
        assert_eq!(bytes[0], FORMAT_VERSION);
        assert_eq!(decode::<Verdict>(&bytes).unwrap(), verdict);
    }

    #[test]
    fn test_json_value_is_lossless() {
        let value = json!({"status": "VERIFIED", "score": 0.5, "tags": ["a", null]});
        let bytes = encode(&value).unwrap();
        assert_eq!(decode::<serde_json::Value>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_unserializable_value_fails() {
        let err = encode(&Unserializable).unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_rejects_unknown_version_and_empty_input() {
        let mut bytes = encode(&"text").unwrap();
        bytes[0] = 99;
        assert!(decode::<String>(&bytes).unwrap_err().is_serialization());
        assert!(decode::<String>(&[]).unwrap_err().is_serialization());
    }

    #[test]
    fn test_type_mismatch_fails() {
        let bytes = encode(&"not a number").unwrap();
        assert!(decode::<u64>(&bytes).unwrap_err().is_serialization());
    }
}
