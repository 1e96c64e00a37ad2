use std::fmt;

use crate::types::REGISTRATION_PREFIX;

/// A provider's ed25519 public key in its canonical form: 64 lowercase hex
/// characters. Every lookup key in the system derives from this string, so
/// normalization happens exactly once, here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ProviderKey {
    hex: String,
}

impl ProviderKey {
    /// Accepts 64 hex characters (any case) that decode to 32 bytes.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let hex_lower = raw.to_lowercase();
        if hex_lower.len() != 64 {
            return None;
        }

        let bytes = hex::decode(&hex_lower).ok()?;
        if bytes.len() != 32 {
            return None;
        }

        Some(Self { hex: hex_lower })
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.hex
    }

    pub(crate) fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // The constructor guarantees 64 valid hex chars.
        if let Ok(decoded) = hex::decode(&self.hex) {
            out.copy_from_slice(&decoded);
        }
        out
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Extracts a provider key from a transaction memo. The prefix may appear
/// anywhere in the comment; everything after it must be exactly the 64-hex
/// key. Malformed memos yield `None` and are skipped by discovery.
pub(crate) fn parse_registration_memo(message: &str) -> Option<ProviderKey> {
    let pos = message.find(REGISTRATION_PREFIX)?;
    let suffix = &message[pos + REGISTRATION_PREFIX.len()..];
    if suffix.is_empty() {
        return None;
    }

    ProviderKey::parse(suffix)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const VALID_HEX: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";

    #[test]
    fn parses_valid_key_and_lowercases() {
        let key = ProviderKey::parse(&VALID_HEX.to_uppercase()).unwrap();
        assert_eq!(key.as_str(), VALID_HEX);
        assert_eq!(key.to_bytes()[0], 0xaa);
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(ProviderKey::parse("abcd").is_none());
        assert!(ProviderKey::parse(&"g".repeat(64)).is_none());
        assert!(ProviderKey::parse(&format!("{VALID_HEX}00")).is_none());
    }

    #[test]
    fn memo_with_prefix_and_key_parses() {
        let memo = format!("tsp-{VALID_HEX}");
        assert_eq!(
            parse_registration_memo(&memo).unwrap().as_str(),
            VALID_HEX
        );
    }

    #[test]
    fn memo_prefix_may_be_embedded() {
        let memo = format!("registration tsp-{VALID_HEX}");
        assert!(parse_registration_memo(&memo).is_some());
    }

    #[test]
    fn bare_prefix_is_skipped() {
        assert!(parse_registration_memo("tsp-").is_none());
        assert!(parse_registration_memo("tsp-zz").is_none());
        assert!(parse_registration_memo("hello").is_none());
    }

    #[test]
    fn trailing_garbage_invalidates_memo() {
        let memo = format!("tsp-{VALID_HEX} thanks");
        assert!(parse_registration_memo(&memo).is_none());
    }
}
