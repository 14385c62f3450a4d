//! Binary payload encoding.
//!
//! Payloads travel as standard base64 without line wrapping. An empty buffer
//! and a missing buffer are both represented by an absent field, so the
//! decoder never yields `Some(vec![])`.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::Serializer;

/// Decode a wire payload. Empty and malformed input is absent.
pub fn decode(value: &str) -> Option<Vec<u8>> {
    if value.is_empty() {
        return None;
    }
    match BASE64_STANDARD.decode(value) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        _ => None,
    }
}

/// Decode an optional wire payload.
pub fn decode_opt(value: Option<&str>) -> Option<Vec<u8>> {
    value.and_then(decode)
}

/// Encode a payload for the wire. Empty buffers have no wire form.
pub fn encode(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(BASE64_STANDARD.encode(bytes))
    }
}

/// `serialize_with` helper for byte fields. Pair with
/// `skip_serializing_if = "Vec::is_empty"` so empty buffers are omitted.
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let bytes = b"hello mesh".to_vec();
        let wire = encode(&bytes).unwrap();
        assert!(!wire.contains('\n'));
        assert_eq!(decode(&wire), Some(bytes));
    }

    #[test]
    fn test_empty_has_no_wire_form() {
        assert_eq!(encode(&[]), None);
        assert_eq!(decode(""), None);
        assert_eq!(decode_opt(None), None);
    }

    #[test]
    fn test_malformed_is_absent() {
        assert_eq!(decode("%%%"), None);
        assert_eq!(decode("abc"), None);
    }

    #[test]
    fn test_long_payload_is_not_wrapped() {
        let bytes = vec![0xAB; 1024];
        let wire = encode(&bytes).unwrap();
        assert!(!wire.contains('\n'));
        assert!(!wire.contains('\r'));
    }
}
