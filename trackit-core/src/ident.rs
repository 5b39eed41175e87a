//! Product identifiers and verification references.
//!
//! Identifiers are generated client-side with no coordination: a millisecond
//! timestamp plus a random base36 suffix under a fixed namespace prefix.
//! The verification reference is a pure string encoding of an identifier
//! (`<base>/verify/<id>`) and must round-trip losslessly.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{ID_ALPHABET, ID_PREFIX, ID_RANDOM_LEN, VERIFY_PATH};

/// Errors from parsing identifiers or verification references
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Input does not match the expected reference or identifier shape
    #[error("Malformed verification reference: {0}")]
    MalformedReference(String),
}

/// Globally unique, immutable product identifier
///
/// The sole join key between a product record and its journey events.
/// Shape: `PROD-<unix-millis>-<random base36>`. The character set is
/// restricted to `[A-Za-z0-9-]` so the identifier can be embedded in a URI
/// path segment without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Generate a fresh identifier.
    ///
    /// Collision resistance comes from the combination of a millisecond
    /// timestamp and ~51 bits of randomness; concurrent registrants on
    /// different machines need no shared state.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_RANDOM_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(format!("{ID_PREFIX}-{millis}-{suffix}"))
    }

    /// Parse and validate an identifier string.
    ///
    /// Requires the generated three-part shape: the `PROD` prefix, a
    /// decimal timestamp segment, and a nonempty alphanumeric suffix.
    /// Validation stays shape-only beyond that: existence is the ledger's
    /// call, not ours. Rejecting degenerate shapes like `PROD--` here
    /// spares the caller a network round-trip for an obvious typo.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let rest = input.strip_prefix(ID_PREFIX).ok_or_else(|| {
            ReferenceError::MalformedReference(format!(
                "identifier must start with '{ID_PREFIX}': {input}"
            ))
        })?;

        let body = rest.strip_prefix('-').ok_or_else(|| {
            ReferenceError::MalformedReference(format!(
                "identifier missing body after prefix: {input}"
            ))
        })?;

        let (millis, suffix) = body.split_once('-').ok_or_else(|| {
            ReferenceError::MalformedReference(format!(
                "identifier must have the shape {ID_PREFIX}-<timestamp>-<suffix>: {input}"
            ))
        })?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReferenceError::MalformedReference(format!(
                "identifier timestamp segment must be decimal digits: {input}"
            )));
        }

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ReferenceError::MalformedReference(format!(
                "identifier suffix must be alphanumeric: {input}"
            )));
        }

        Ok(Self(input.to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shareable pointer to a product identifier
///
/// A URI whose path suffix is exactly the identifier string. Typically
/// rendered as a QR code at registration and scanned by verifiers. Carries
/// no state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationReference(String);

impl VerificationReference {
    /// Derive a reference from an identifier and a base URI.
    pub fn derive(id: &ProductId, base_uri: &str) -> Self {
        let base = base_uri.trim_end_matches('/');
        Self(format!("{base}{VERIFY_PATH}{id}"))
    }

    /// Extract the identifier back out of a reference string.
    ///
    /// Inverse of [`VerificationReference::derive`]: for every valid
    /// identifier, `resolve(derive(id, base)) == id`.
    pub fn resolve(reference: &str) -> Result<ProductId, ReferenceError> {
        let idx = reference.rfind(VERIFY_PATH).ok_or_else(|| {
            ReferenceError::MalformedReference(format!(
                "reference does not contain '{VERIFY_PATH}': {reference}"
            ))
        })?;

        let suffix = &reference[idx + VERIFY_PATH.len()..];
        if suffix.is_empty() {
            return Err(ReferenceError::MalformedReference(
                "reference has no identifier after the verify segment".to_string(),
            ));
        }

        ProductId::parse(suffix)
    }

    /// Whether a raw input string looks like a reference (as opposed to a
    /// bare identifier).
    pub fn matches_shape(input: &str) -> bool {
        input.contains(VERIFY_PATH)
    }

    /// The reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        let id = ProductId::generate();
        assert!(id.as_str().starts_with("PROD-"));
        assert!(ProductId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_generate_uri_safe() {
        for _ in 0..1000 {
            let id = ProductId::generate();
            assert!(
                id.as_str()
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-'),
                "unsafe character in {id}"
            );
        }
    }

    #[test]
    fn test_generate_unique_concurrent() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..25_000)
                        .map(|_| ProductId::generate())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id.as_str().to_string()), "duplicate: {id}");
            }
        }
        assert_eq!(seen.len(), 100_000);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(ProductId::parse("").is_err());
        assert!(ProductId::parse("PROD").is_err());
        assert!(ProductId::parse("PROD-").is_err());
        assert!(ProductId::parse("ITEM-123-abc").is_err());
        assert!(ProductId::parse("PROD-123/abc").is_err());
        assert!(ProductId::parse("PROD-123 abc").is_err());
    }

    #[test]
    fn test_parse_rejects_degenerate_shapes() {
        // Two-part and empty-segment inputs are typos, not identifiers.
        assert!(ProductId::parse("PROD--").is_err());
        assert!(ProductId::parse("PROD-1").is_err());
        assert!(ProductId::parse("PROD-123-").is_err());
        assert!(ProductId::parse("PROD--abc").is_err());
        assert!(ProductId::parse("PROD-abc-def").is_err());
        assert!(ProductId::parse("PROD-does-not-exist").is_err());
    }

    #[test]
    fn test_parse_accepts_legacy_short_suffix() {
        // Identifiers minted by older registrants used a 9-char suffix.
        assert!(ProductId::parse("PROD-1234567890-abc123def").is_ok());
    }

    #[test]
    fn test_reference_round_trip() {
        for base in ["https://trackit.example", "https://trackit.example/"] {
            let id = ProductId::generate();
            let reference = VerificationReference::derive(&id, base);
            let resolved = VerificationReference::resolve(reference.as_str()).unwrap();
            assert_eq!(resolved, id);
        }
    }

    #[test]
    fn test_reference_shape_detection() {
        let id = ProductId::generate();
        let reference = VerificationReference::derive(&id, "https://trackit.example");
        assert!(VerificationReference::matches_shape(reference.as_str()));
        assert!(!VerificationReference::matches_shape(id.as_str()));
    }

    #[test]
    fn test_resolve_rejects_malformed() {
        assert!(VerificationReference::resolve("https://x.example/PROD-1-a").is_err());
        assert!(VerificationReference::resolve("https://x.example/verify/").is_err());
        assert!(VerificationReference::resolve("https://x.example/verify/not-a-product").is_err());
    }
}
