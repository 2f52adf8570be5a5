//! Fairness Engine
//!
//! Server-seed commitment scheme for single-party games.
//!
//! ## Protocol
//!
//! 1. At startup the engine holds a secret seed (32 random bytes as hex,
//!    or a pinned value from configuration) and publishes
//!    `serverSeedHash = sha256(secret)`.
//! 2. Every round draws a fresh 8-byte nonce and computes
//!    `digest = sha256(secret ":" nonce [":" tag] [":" clientSeed])`.
//! 3. Results are extracted from the digest (see [`super::outcome`]).
//!
//! Once the secret is disclosed anyone can recompute each digest and check
//! it against the commitment published before the round was played.

use rand::RngCore;
use std::fmt;

use crate::core::hash::{Digest, PreimageHasher, hash_bytes, hex_digest_eq};
use super::outcome::Extract;

/// Secret seed size in bytes.
pub const SERVER_SEED_BYTES: usize = 32;

/// Round nonce size in bytes.
pub const NONCE_BYTES: usize = 8;

/// The process-wide secret seed.
///
/// The hex string itself is the secret that enters every preimage.
#[derive(Clone)]
pub struct ServerSeed(String);

impl ServerSeed {
    /// Generate a fresh random seed.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SERVER_SEED_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Use a fixed seed (reproducible testing or operator-pinned seeds).
    pub fn pinned(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Pinned seed when configured, otherwise a random one.
    pub fn from_config(secret: Option<&str>) -> Self {
        match secret {
            Some(s) if !s.is_empty() => Self::pinned(s),
            _ => Self::generate(),
        }
    }

    /// Commitment hash of this seed.
    pub fn commitment(&self) -> Digest {
        hash_bytes(self.0.as_bytes())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServerSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerSeed(<redacted>)")
    }
}

/// Result of resolving one value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution<O> {
    /// Round nonce (also the round id).
    pub nonce: String,
    /// Extracted value.
    pub result: O,
    /// Digest the value was extracted from.
    pub proof_digest: Digest,
    /// Standing commitment of the server seed.
    pub server_seed_hash: String,
}

impl<O> Resolution<O> {
    /// Proof digest as hex.
    pub fn proof_hex(&self) -> String {
        hex::encode(self.proof_digest)
    }
}

/// Verifiable outcome generator.
///
/// Constructed once by whatever composes the server and shared by
/// reference; the seed is immutable for the engine's lifetime.
#[derive(Debug)]
pub struct FairnessEngine {
    seed: ServerSeed,
    commitment_hex: String,
}

impl FairnessEngine {
    /// Create an engine around a seed.
    pub fn new(seed: ServerSeed) -> Self {
        let commitment_hex = hex::encode(seed.commitment());
        Self { seed, commitment_hex }
    }

    /// Create an engine with a random seed.
    pub fn generate() -> Self {
        Self::new(ServerSeed::generate())
    }

    /// Publishable hash of the secret seed.
    pub fn commit(&self) -> &str {
        &self.commitment_hex
    }

    /// Draw a fresh unpredictable nonce.
    pub fn new_nonce() -> String {
        let mut bytes = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Compute the digest for `(nonce, tag, extra)` under this engine's seed.
    pub fn digest(&self, nonce: &str, tag: Option<&str>, extra: Option<&str>) -> Digest {
        round_digest(self.seed.expose(), nonce, tag, extra)
    }

    /// Resolve a single value with a fresh nonce.
    pub fn resolve<O: Extract>(&self, tag: Option<&str>, extra: Option<&str>) -> Resolution<O> {
        self.resolve_with_nonce(&Self::new_nonce(), tag, extra)
    }

    /// Resolve a single value for a given nonce. Deterministic.
    pub fn resolve_with_nonce<O: Extract>(
        &self,
        nonce: &str,
        tag: Option<&str>,
        extra: Option<&str>,
    ) -> Resolution<O> {
        let proof_digest = self.digest(nonce, tag, extra);
        Resolution {
            nonce: nonce.to_string(),
            result: O::extract(&proof_digest),
            proof_digest,
            server_seed_hash: self.commitment_hex.clone(),
        }
    }

    /// Start a multi-value round with a fresh nonce.
    pub fn round(&self, extra: Option<&str>) -> Round<'_> {
        self.round_with_nonce(Self::new_nonce(), extra)
    }

    /// Start a multi-value round for a given nonce.
    pub fn round_with_nonce(&self, nonce: String, extra: Option<&str>) -> Round<'_> {
        Round {
            engine: self,
            nonce,
            extra: extra.map(str::to_string),
        }
    }
}

/// A round that draws several independent, tag-separated values.
pub struct Round<'a> {
    engine: &'a FairnessEngine,
    nonce: String,
    extra: Option<String>,
}

impl<'a> Round<'a> {
    /// Round nonce.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Standing commitment of the engine.
    pub fn server_seed_hash(&self) -> &str {
        self.engine.commit()
    }

    /// Digest for a tag.
    pub fn digest(&self, tag: &str) -> Digest {
        self.engine.digest(&self.nonce, Some(tag), self.extra.as_deref())
    }

    /// Draw a value for a tag.
    pub fn draw<O: Extract>(&self, tag: &str) -> O {
        O::extract(&self.digest(tag))
    }

    /// Digest binding the round seed to a list of published values:
    /// `sha256(secret ":" nonce ":" part ":" part ...)`.
    pub fn bind(&self, parts: &[&str]) -> Digest {
        parts.iter().fold(
            PreimageHasher::joined()
                .part(self.engine.seed.expose())
                .part(&self.nonce),
            |h, p| h.part(p),
        ).finalize()
    }
}

/// `sha256(secret ":" nonce [":" tag] [":" extra])`.
pub fn round_digest(secret: &str, nonce: &str, tag: Option<&str>, extra: Option<&str>) -> Digest {
    PreimageHasher::joined()
        .part(secret)
        .part(nonce)
        .optional_part(tag)
        .optional_part(extra)
        .finalize()
}

/// Check a disclosed secret against a published commitment.
pub fn verify_commitment(secret: &str, commitment_hex: &str) -> bool {
    hex_digest_eq(commitment_hex, &hash_bytes(secret.as_bytes()))
}

/// Re-derive a round from a disclosed secret and check the published values.
pub fn verify_round<O: Extract + PartialEq>(
    secret: &str,
    nonce: &str,
    tag: Option<&str>,
    extra: Option<&str>,
    claimed: &O,
    proof_hex: &str,
) -> bool {
    let digest = round_digest(secret, nonce, tag, extra);
    hex_digest_eq(proof_hex, &digest) && O::extract(&digest) == *claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::outcome::{BottleSide, Die};

    const GOLDEN_DIGEST: &str = "533dc1c5d9b901e3bf47b50b24e0b316794cb8d54be3a34565357eeb5b9e424a";

    fn test_engine() -> FairnessEngine {
        FairnessEngine::new(ServerSeed::pinned("abc"))
    }

    #[test]
    fn test_commitment_is_hash_of_secret() {
        let engine = test_engine();
        assert_eq!(
            engine.commit(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(verify_commitment("abc", engine.commit()));
    }

    #[test]
    fn test_commitment_binding_single_bit() {
        // 'a' = 0x61, 'a' ^ 1 = 0x60 = '`'
        let flipped = FairnessEngine::new(ServerSeed::pinned("`bc"));
        assert_ne!(test_engine().commit(), flipped.commit());
        assert!(!verify_commitment("`bc", test_engine().commit()));
    }

    #[test]
    fn test_commitment_stable() {
        let engine = FairnessEngine::generate();
        let first = engine.commit().to_string();
        let _ = engine.resolve::<BottleSide>(None, None);
        assert_eq!(engine.commit(), first);
    }

    #[test]
    fn test_golden_vector() {
        let engine = test_engine();
        let resolution = engine.resolve_with_nonce::<BottleSide>("01", Some("player"), None);
        assert_eq!(resolution.proof_hex(), GOLDEN_DIGEST);
        // 0x533dc1c5: low bit set
        assert_eq!(resolution.result, BottleSide::Down);

        let die = engine.resolve_with_nonce::<Die>("01", Some("player"), None);
        // 0x53 = 83, 83 % 6 + 1 = 6
        assert_eq!(die.result.value(), 6);
    }

    #[test]
    fn test_resolve_deterministic() {
        let engine = test_engine();
        let a = engine.resolve_with_nonce::<Die>("ff00", Some("cpu:2"), Some("client"));
        let b = engine.resolve_with_nonce::<Die>("ff00", Some("cpu:2"), Some("client"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_untagged_digest() {
        let engine = test_engine();
        assert_eq!(
            hex::encode(engine.digest("01", None, None)),
            "a98fc70f3f46bdaabbf35de987e7443a1a172c17a3ccd5ebc6d494b25065f925"
        );
    }

    #[test]
    fn test_tags_separate_digests() {
        let engine = test_engine();
        let round = engine.round_with_nonce("01".into(), None);
        assert_ne!(round.digest("player:1"), round.digest("cpu:1"));
        assert_ne!(round.digest("player:1"), round.digest("player:2"));
    }

    #[test]
    fn test_nonce_format() {
        let nonce = FairnessEngine::new_nonce();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(hex::decode(&nonce).is_ok());
        assert_ne!(nonce, FairnessEngine::new_nonce());
    }

    #[test]
    fn test_generated_seed_shape() {
        let seed = ServerSeed::generate();
        assert_eq!(seed.expose().len(), SERVER_SEED_BYTES * 2);
        assert_eq!(format!("{:?}", seed), "ServerSeed(<redacted>)");
    }

    #[test]
    fn test_from_config_pins_seed() {
        let a = FairnessEngine::new(ServerSeed::from_config(Some("pinned")));
        let b = FairnessEngine::new(ServerSeed::from_config(Some("pinned")));
        assert_eq!(a.commit(), b.commit());

        let c = FairnessEngine::new(ServerSeed::from_config(Some("")));
        assert_ne!(a.commit(), c.commit());
    }

    #[test]
    fn test_verify_round() {
        let engine = test_engine();
        let r = engine.resolve::<BottleSide>(Some("player"), None);
        assert!(verify_round("abc", &r.nonce, Some("player"), None, &r.result, &r.proof_hex()));

        let other = match r.result {
            BottleSide::Up => BottleSide::Down,
            BottleSide::Down => BottleSide::Up,
        };
        assert!(!verify_round("abc", &r.nonce, Some("player"), None, &other, &r.proof_hex()));
        assert!(!verify_round("abd", &r.nonce, Some("player"), None, &r.result, &r.proof_hex()));
    }

    #[test]
    fn test_round_bind() {
        let engine = test_engine();
        let round = engine.round_with_nonce("01".into(), None);
        assert_eq!(
            round.bind(&["4,6,1", "6,5,5"]),
            hash_bytes(b"abc:01:4,6,1:6,5,5")
        );
    }

    #[test]
    fn test_binary_uniformity() {
        let engine = FairnessEngine::generate();
        let samples = 20_000;
        let ups = (0..samples)
            .filter(|_| engine.resolve::<BottleSide>(None, None).result == BottleSide::Up)
            .count();
        let ratio = ups as f64 / samples as f64;
        assert!((0.47..=0.53).contains(&ratio), "up ratio {}", ratio);
    }

    #[test]
    fn test_die_uniformity() {
        let engine = FairnessEngine::generate();
        let samples = 30_000;
        let mut counts = [0usize; 6];
        for _ in 0..samples {
            let die = engine.resolve::<Die>(Some("player"), None).result;
            counts[(die.value() - 1) as usize] += 1;
        }
        for (face, count) in counts.iter().enumerate() {
            let ratio = *count as f64 / samples as f64;
            assert!((ratio - 1.0 / 6.0).abs() < 0.02, "face {} ratio {}", face + 1, ratio);
        }
    }
}
