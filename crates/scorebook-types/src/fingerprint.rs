use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content fingerprint of a match scorecard.
///
/// A `Fingerprint` is the BLAKE3 hash of the statistically relevant fields of
/// a match. Identical scorecards always produce the same fingerprint; any
/// correction to a field that feeds the statistics produces a different one.
///
/// Serialized as a 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a `Fingerprint` from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Domain-separated BLAKE3 hasher for fingerprints.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a scorecard and some other document with identical bytes
/// never share a fingerprint. Bumping the version suffix of a domain
/// invalidates every fingerprint computed under the old one.
pub struct FingerprintHasher {
    domain: &'static str,
}

impl FingerprintHasher {
    /// Hasher for match scorecards.
    pub const SCORECARD: Self = Self {
        domain: "scorebook-scorecard-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Fingerprint::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: Serialize>(&self, value: &T) -> Result<Fingerprint, TypeError> {
        let data =
            serde_json::to_vec(value).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = FingerprintHasher::SCORECARD.hash(b"scorecard");
        let b = FingerprintHasher::SCORECARD.hash(b"scorecard");
        assert_eq!(a, b);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let custom = FingerprintHasher::new("scorebook-other-v1");
        assert_ne!(
            FingerprintHasher::SCORECARD.hash(b"same"),
            custom.hash(b"same")
        );
    }

    #[test]
    fn hex_roundtrip() {
        let fp = FingerprintHasher::SCORECARD.hash(b"test");
        let parsed = Fingerprint::from_hex(&fp.to_hex()).unwrap();
        assert_eq!(parsed, fp);
        assert_eq!(fp.short_hex().len(), 8);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert_eq!(
            Fingerprint::from_hex("abcd"),
            Err(TypeError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
        assert!(matches!(
            Fingerprint::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let fp = FingerprintHasher::SCORECARD.hash(b"serde");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn hash_json_tracks_content() {
        let a = FingerprintHasher::SCORECARD
            .hash_json(&serde_json::json!({"runs": 150}))
            .unwrap();
        let b = FingerprintHasher::SCORECARD
            .hash_json(&serde_json::json!({"runs": 151}))
            .unwrap();
        assert_ne!(a, b);
    }
}
