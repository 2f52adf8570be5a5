//! Outcome Extraction
//!
//! Maps a round digest to discrete game values. These mappings are part of
//! the verification contract: a player who learns the server seed must be
//! able to reproduce every value bit-for-bit.
//!
//! | Value | Bytes read | Mapping |
//! |---|---|---|
//! | [`BottleSide`] | 0..4 as big-endian `u32` | bit 0: `0 → up`, `1 → down` |
//! | [`Die`] | byte 0 | `byte % 6 + 1` |
//! | [`roll_three`] die `i` | byte `i - 1` of the digest for tag `"{tag}:{i}"` | `byte % 6 + 1` |
//!
//! `256 % 6 == 4`, so faces 1..=4 are drawn with probability 43/256 and
//! faces 5..=6 with 42/256.

use serde::{Serialize, Deserialize};

use crate::core::hash::Digest;

/// A value that can be drawn from a round digest.
pub trait Extract: Sized {
    /// Deterministically derive the value from a digest.
    fn extract(digest: &Digest) -> Self;
}

/// Bottle flip landing side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleSide {
    /// Lands upright.
    Up,
    /// Falls over.
    Down,
}

impl BottleSide {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl Extract for BottleSide {
    fn extract(digest: &Digest) -> Self {
        let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        if word & 1 == 0 { Self::Up } else { Self::Down }
    }
}

/// A six-sided die face (1..=6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Die(u8);

impl Die {
    /// Face value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Map a single byte to a face.
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self(byte % 6 + 1)
    }
}

impl Extract for Die {
    fn extract(digest: &Digest) -> Self {
        Self::from_byte(digest[0])
    }
}

/// Roll three dice for one hand.
///
/// `digest_for` is asked for the digest of tag `"{tag}:1"`, `"{tag}:2"` and
/// `"{tag}:3"`; die `i` reads byte `i - 1` of its own digest.
pub fn roll_three<F>(tag: &str, mut digest_for: F) -> [Die; 3]
where
    F: FnMut(&str) -> Digest,
{
    let mut dice = [Die(1); 3];
    for (i, die) in dice.iter_mut().enumerate() {
        let digest = digest_for(&format!("{}:{}", tag, i + 1));
        *die = Die::from_byte(digest[i]);
    }
    dice
}

/// Sum of a hand.
pub fn hand_total(dice: &[Die]) -> u32 {
    dice.iter().map(|d| d.value() as u32).sum()
}
