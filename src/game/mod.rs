//! Single-Party Games
//!
//! House games resolved synchronously from the fairness engine. Payout
//! policy is a pure function of the drawn result and the wager.
//!
//! ## Module Structure
//!
//! - `bottleflip`: up/down flip with a 5% house edge
//! - `dice`: three dice against the house

pub mod bottleflip;
pub mod dice;

use serde::Deserialize;
use serde_json::Value;

/// Body of a single-party round request.
///
/// Fields stay loosely typed so malformed input maps to a structured
/// validation error instead of a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    /// Stake, as a JSON number or numeric string.
    #[serde(default)]
    pub wager: Option<Value>,
    /// Game-specific choice.
    #[serde(default)]
    pub choice: Option<Value>,
    /// Optional client entropy mixed into the round digest.
    #[serde(default)]
    pub client_seed: Option<String>,
}

impl PlayRequest {
    /// Parse a raw body; anything unparseable becomes an empty request.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Client seed, ignoring empty strings.
    pub fn client_seed(&self) -> Option<&str> {
        self.client_seed.as_deref().filter(|s| !s.is_empty())
    }
}

/// Lower bound for a game's wager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WagerRule {
    /// Minimum stake.
    pub min: f64,
    /// Whether `min` itself is allowed.
    pub inclusive: bool,
}

impl WagerRule {
    /// Validate a raw wager value.
    pub fn parse(&self, raw: Option<&Value>) -> Result<f64, GameError> {
        let wager = match raw {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match wager {
            Some(w) if w.is_finite() && (w > self.min || (self.inclusive && w == self.min)) => Ok(w),
            _ => Err(GameError::InvalidWager { min: self.min }),
        }
    }
}

/// Round to four decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Validation errors for single-party rounds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// Wager missing, not finite, or below the game's minimum.
    #[error("wager must be a finite number above {min}")]
    InvalidWager {
        /// The game's minimum stake.
        min: f64,
    },

    /// Choice outside the game's enumerated set.
    #[error("choice must be one of: {0}")]
    InvalidChoice(&'static str),
}

impl GameError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidWager { .. } => "invalid_wager",
            Self::InvalidChoice(_) => "invalid_choice",
        }
    }
}
