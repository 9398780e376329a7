//! Hash algorithms available for naming objects.
//!
//! The set is fixed at compile time. An algorithm identifier is resolved once
//! when the configuration is validated, and the resulting `HashAlgorithm`
//! hands out fresh hashers for each store call.

use digest::DynDigest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A supported content hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm, in identifier order.
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
    ];

    /// The configuration identifier (`md5`, `sha1`, `sha256`, `sha512`).
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// A fresh running hash for this algorithm.
    pub fn hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            HashAlgorithm::Md5 => Box::new(md5::Md5::default()),
            HashAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            HashAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            HashAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Length of an object name (lowercase hex digest) in characters.
    pub fn name_len(&self) -> usize {
        self.digest_len() * 2
    }

    /// md5 and sha1 have practical collision attacks.
    pub fn is_weak(&self) -> bool {
        matches!(self, HashAlgorithm::Md5 | HashAlgorithm::Sha1)
    }

    /// Hash a byte slice in one call and return the object name.
    pub fn name_of(&self, data: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

/// Whether `name` has the shape of an object name: non-empty lowercase hex.
///
/// The length is not tied to any algorithm, so a store can read objects that
/// were written under a different hash function into the same directory.
/// Path separators, dots and uppercase are all rejected.
pub fn is_object_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedHashAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported() {
        for algorithm in HashAlgorithm::ALL {
            let parsed: HashAlgorithm = algorithm.as_str().parse().unwrap();
            assert_eq!(parsed, algorithm);
        }
    }

    #[test]
    fn test_parse_unsupported() {
        let result: Result<HashAlgorithm, _> = "blake3".parse();
        assert!(matches!(result, Err(ConfigError::UnsupportedHashAlgorithm(ref s)) if s == "blake3"));

        // Identifiers are case-sensitive
        assert!("SHA256".parse::<HashAlgorithm>().is_err());
        assert!("".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_empty_input_digests() {
        assert_eq!(
            HashAlgorithm::Md5.name_of(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            HashAlgorithm::Sha1.name_of(b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            HashAlgorithm::Sha256.name_of(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            HashAlgorithm::Sha512.name_of(b""),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn test_name_len_matches_hasher_output() {
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(algorithm.hasher().output_size(), algorithm.digest_len());
            assert_eq!(algorithm.name_of(b"abc").len(), algorithm.name_len());
        }
    }

    #[test]
    fn test_is_object_name() {
        for algorithm in HashAlgorithm::ALL {
            assert!(is_object_name(&algorithm.name_of(b"abc")));
        }
        assert!(is_object_name("d41d8cd98f00b204"));

        assert!(!is_object_name("D41D8CD98F00B204E9800998ECF8427E"));
        assert!(!is_object_name("../../../../etc/passwd0000000000"));
        assert!(!is_object_name("abc/def"));
        assert!(!is_object_name(".blob-abc"));
        assert!(!is_object_name(""));
    }

    #[test]
    fn test_weak_algorithms() {
        assert!(HashAlgorithm::Md5.is_weak());
        assert!(HashAlgorithm::Sha1.is_weak());
        assert!(!HashAlgorithm::Sha256.is_weak());
        assert!(!HashAlgorithm::Sha512.is_weak());
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&HashAlgorithm::Sha512).unwrap();
        assert_eq!(json, "\"sha512\"");
        let restored: HashAlgorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, HashAlgorithm::Sha512);
    }
}
