//! Hashing for Verification
//!
//! Every verifiable value in the system is a SHA-256 digest:
//! - Server seed commitments
//! - Round digests for single-party games
//! - Player seed commitments and two-party winner proofs
//!
//! Preimages are built from text parts so a player can recompute them with
//! any off-the-shelf SHA-256 tool.

use sha2::{Sha256, Digest as _};

/// Hash output type (256 bits / 32 bytes)
pub type Digest = [u8; 32];

/// Separator placed between preimage parts of round digests.
pub const PART_SEPARATOR: &[u8] = b":";

/// Incremental hasher for text preimages.
///
/// Order of updates is critical: the same parts in a different order
/// produce a different digest.
pub struct PreimageHasher {
    hasher: Sha256,
    parts: usize,
    separator: Option<&'static [u8]>,
}

impl PreimageHasher {
    /// Hasher that joins parts with `:`.
    pub fn joined() -> Self {
        Self {
            hasher: Sha256::new(),
            parts: 0,
            separator: Some(PART_SEPARATOR),
        }
    }

    /// Hasher that concatenates parts with no separator.
    pub fn concatenated() -> Self {
        Self {
            hasher: Sha256::new(),
            parts: 0,
            separator: None,
        }
    }

    /// Append a part.
    pub fn part(mut self, bytes: impl AsRef<[u8]>) -> Self {
        if self.parts > 0 {
            if let Some(sep) = self.separator {
                self.hasher.update(sep);
            }
        }
        self.hasher.update(bytes.as_ref());
        self.parts += 1;
        self
    }

    /// Append a part only when present.
    pub fn optional_part(self, bytes: Option<impl AsRef<[u8]>>) -> Self {
        match bytes {
            Some(b) => self.part(b),
            None => self,
        }
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Digest {
        self.hasher.finalize().into()
    }
}

/// Compute a simple hash of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(hash_bytes(data.as_ref()))
}

/// Compare a hex digest supplied by a client with a computed digest.
///
/// Case-insensitive; surrounding whitespace is ignored.
pub fn hex_digest_eq(supplied: &str, computed: &Digest) -> bool {
    match hex::decode(supplied.trim().to_ascii_lowercase()) {
        Ok(bytes) => bytes.as_slice() == computed.as_slice(),
        Err(_) => false,
    }
}

/// Whether a string is a well-formed 32-byte hex digest.
pub fn is_hex_digest(s: &str) -> bool {
    let s = s.trim();
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_joined_matches_manual_preimage() {
        let joined = PreimageHasher::joined().part("abc").part("01").part("player").finalize();
        assert_eq!(joined, hash_bytes(b"abc:01:player"));
    }

    #[test]
    fn test_concatenated_has_no_separator() {
        let digest = PreimageHasher::concatenated().part("ab").part("c").finalize();
        assert_eq!(digest, hash_bytes(b"abc"));
    }

    #[test]
    fn test_optional_part_skipped() {
        let without = PreimageHasher::joined().part("a").optional_part(None::<&str>).finalize();
        assert_eq!(without, hash_bytes(b"a"));

        let with = PreimageHasher::joined().part("a").optional_part(Some("b")).finalize();
        assert_eq!(with, hash_bytes(b"a:b"));
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = PreimageHasher::joined().part("1").part("2").finalize();
        let hash2 = PreimageHasher::joined().part("2").part("1").finalize();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hex_digest_eq_ignores_case() {
        let digest = hash_bytes(b"abc");
        let upper = hex::encode(digest).to_uppercase();
        assert!(hex_digest_eq(&upper, &digest));
        assert!(!hex_digest_eq("zz", &digest));
        assert!(!hex_digest_eq(&sha256_hex("abd"), &digest));
    }

    #[test]
    fn test_is_hex_digest() {
        assert!(is_hex_digest(&sha256_hex("x")));
        assert!(!is_hex_digest("abc"));
        assert!(!is_hex_digest(&"g".repeat(64)));
    }
}
