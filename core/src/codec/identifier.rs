//! Identifier parsing.
//!
//! Every identifier crossing the host boundary (user, peer, message, API key)
//! is a 128-bit UUID rendered in the canonical hyphenated lowercase form.
//! Parsing is total: anything that is not a hyphenated UUID is absent.

use uuid::Uuid;

/// Length of the canonical `8-4-4-4-12` rendering.
const HYPHENATED_LEN: usize = 36;

/// The current user's identifier.
pub type UserId = Uuid;
/// A connected or addressed peer.
pub type PeerId = Uuid;
/// A message handed to or received from the SDK.
pub type MessageId = Uuid;
/// The SDK license key.
pub type ApiKey = Uuid;

/// Parse a wire identifier. Empty, short, braced, URN and simple (unhyphenated)
/// forms are all rejected so that a present value always renders back to the
/// string the host sent, modulo letter case.
pub fn parse(value: &str) -> Option<Uuid> {
    let value = value.trim();
    if value.len() != HYPHENATED_LEN {
        return None;
    }
    Uuid::parse_str(value).ok()
}

/// Parse an optional wire identifier.
pub fn parse_opt(value: Option<&str>) -> Option<Uuid> {
    value.and_then(parse)
}

/// Canonical wire rendering.
pub fn render(id: &Uuid) -> String {
    id.hyphenated().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let s = "123e4567-e89b-12d3-a456-426614174000";
        let id = parse(s).unwrap();
        assert_eq!(render(&id), s);
    }

    #[test]
    fn test_uppercase_is_canonicalized() {
        let id = parse("123E4567-E89B-12D3-A456-426614174000").unwrap();
        assert_eq!(render(&id), "123e4567-e89b-12d3-a456-426614174000");
    }

    #[test]
    fn test_malformed_is_absent() {
        assert!(parse("").is_none());
        assert!(parse("   ").is_none());
        assert!(parse("not-a-uuid").is_none());
        assert!(parse("123e4567e89b12d3a456426614174000").is_none());
        assert!(parse("{123e4567-e89b-12d3-a456-426614174000}").is_none());
        assert!(parse("123e4567-e89b-12d3-a456-42661417400z").is_none());
        assert!(parse_opt(None).is_none());
    }
}
