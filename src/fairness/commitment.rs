//! Two-Party Commitment Protocol
//!
//! Each player commits to `sha256(seed)` before seeing the other player's
//! seed, then reveals the seed. The winner is derived from both seeds so
//! neither party can choose theirs after seeing the other's.

use serde::{Serialize, Deserialize};

use crate::core::hash::{Digest, PreimageHasher, hash_bytes, hex_digest_eq, is_hex_digest};

/// Commitment to a player seed (hex SHA-256, as sent by the client).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedCommitment(String);

impl SeedCommitment {
    /// Parse a client-supplied commitment. Normalised to lowercase hex.
    pub fn parse(s: &str) -> Result<Self, CommitmentError> {
        if !is_hex_digest(s) {
            return Err(CommitmentError::MalformedCommitment);
        }
        Ok(Self(s.trim().to_ascii_lowercase()))
    }

    /// Commitment for a seed.
    pub fn for_seed(seed: &str) -> Self {
        Self(hex::encode(hash_bytes(seed.as_bytes())))
    }

    /// Whether a revealed seed opens this commitment.
    pub fn opens(&self, seed: &str) -> bool {
        hex_digest_eq(&self.0, &hash_bytes(seed.as_bytes()))
    }

    /// Hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of the winner draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinnerProof {
    /// Index into the room's player list (0 or 1).
    pub winner_index: usize,
    /// `sha256(roomId ++ seed0 ++ seed1)`.
    pub digest: Digest,
}

impl WinnerProof {
    /// Digest as hex.
    pub fn proof_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Compute the winner from the room id and both seeds in list order.
///
/// The preimage is `roomId ++ seed0 ++ seed1` with no separators; the
/// winner index is the low bit of the last digest byte.
pub fn draw_winner(room_id: &str, seed0: &str, seed1: &str) -> WinnerProof {
    let digest = PreimageHasher::concatenated()
        .part(room_id)
        .part(seed0)
        .part(seed1)
        .finalize();

    WinnerProof {
        winner_index: (digest[31] & 1) as usize,
        digest,
    }
}

/// Reveal check for one player.
pub fn verify_reveal(commitment: &SeedCommitment, seed: &str) -> Result<(), CommitmentError> {
    if commitment.opens(seed) {
        Ok(())
    } else {
        Err(CommitmentError::PreimageMismatch)
    }
}

/// Errors that can occur during commitment verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitmentError {
    /// Commitment is not a 32-byte hex digest.
    #[error("commitment must be a 64-character hex SHA-256 digest")]
    MalformedCommitment,

    /// Revealed seed doesn't hash to the commitment.
    #[error("revealed seed does not match commitment")]
    PreimageMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = "00000000-0000-4000-8000-000000000001";

    #[test]
    fn test_commitment_opens() {
        let c = SeedCommitment::for_seed("seed-a");
        assert_eq!(
            c.as_str(),
            "e00961cc04e55c4533144d93fda113d960b6ad37e54a86a41bbba4f031e29d92"
        );
        assert!(c.opens("seed-a"));
        assert!(!c.opens("seed-b"));
        assert!(verify_reveal(&c, "seed-a").is_ok());
        assert_eq!(verify_reveal(&c, "seed-b"), Err(CommitmentError::PreimageMismatch));
    }

    #[test]
    fn test_parse_normalises_case() {
        let upper = SeedCommitment::for_seed("x").as_str().to_uppercase();
        let parsed = SeedCommitment::parse(&upper).unwrap();
        assert_eq!(parsed, SeedCommitment::for_seed("x"));
        assert!(parsed.opens("x"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(SeedCommitment::parse("nope"), Err(CommitmentError::MalformedCommitment));
        assert_eq!(SeedCommitment::parse(""), Err(CommitmentError::MalformedCommitment));
    }

    #[test]
    fn test_winner_vector() {
        let proof = draw_winner(ROOM, "seed-a", "seed-b");
        assert_eq!(
            proof.proof_hex(),
            "b3093b132d7c2f6e847e46d3d34ffcb599eca9ee06224e7a0f27755376afd825"
        );
        // last byte 0x25
        assert_eq!(proof.winner_index, 1);
    }

    #[test]
    fn test_winner_order_sensitive() {
        let forward = draw_winner(ROOM, "seed-a", "seed-b");
        let swapped = draw_winner(ROOM, "seed-b", "seed-a");
        assert_ne!(forward.digest, swapped.digest);
        assert_eq!(
            swapped.proof_hex(),
            "1c0247ac2780b518bcc3cb037f03d743a5c2fa6a440bba3c5bb2d2ea808705d9"
        );
    }

    #[test]
    fn test_winner_reproducible() {
        assert_eq!(draw_winner(ROOM, "x", "y"), draw_winner(ROOM, "x", "y"));
        assert_ne!(draw_winner(ROOM, "x", "y").digest, draw_winner("other", "x", "y").digest);
    }
}
