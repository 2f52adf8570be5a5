//! Bottle Flip
//!
//! Player calls `up` or `down`; the side is drawn from the untagged round
//! digest (`sha256(secret ":" nonce [":" clientSeed])`).

use serde::Serialize;
use serde_json::Value;

use crate::core::clock::iso_timestamp;
use crate::fairness::{BottleSide, FairnessEngine};
use super::{GameError, PlayRequest, WagerRule, round4};

/// House edge in percent.
pub const HOUSE_EDGE_PCT: f64 = 5.0;

/// Any positive stake.
pub const WAGER_RULE: WagerRule = WagerRule { min: 0.0, inclusive: false };

/// Settled bottle flip round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleFlipRound {
    /// Round identifier (same as the nonce).
    pub round_id: String,
    /// Drawn side.
    pub outcome: BottleSide,
    /// Player's call.
    pub choice: BottleSide,
    /// Whether the call matched.
    pub won: bool,
    /// Amount returned to the player.
    pub payout: f64,
    /// Standing server seed commitment.
    pub server_seed_hash: String,
    /// Round nonce.
    pub nonce: String,
    /// Digest the side was read from.
    pub proof_digest: String,
    /// House edge in percent.
    pub house_edge: f64,
    /// Return to player in percent.
    pub rtp: f64,
    /// Resolution time.
    pub timestamp: String,
}

/// Parse the player's call.
///
/// Strings match case-insensitively; a bool maps `true → up`, `false → down`.
/// A missing or unrecognised call is rejected, never read as `down`.
pub fn parse_choice(raw: Option<&Value>) -> Result<BottleSide, GameError> {
    match raw {
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(BottleSide::Up),
            "down" => Ok(BottleSide::Down),
            _ => Err(GameError::InvalidChoice("up, down")),
        },
        Some(Value::Bool(true)) => Ok(BottleSide::Up),
        Some(Value::Bool(false)) => Ok(BottleSide::Down),
        _ => Err(GameError::InvalidChoice("up, down")),
    }
}

/// Payout for a settled flip.
pub fn payout(wager: f64, won: bool) -> f64 {
    if won {
        round4(wager * (2.0 - HOUSE_EDGE_PCT / 100.0))
    } else {
        0.0
    }
}

/// Validate the request and resolve a round with a fresh nonce.
pub fn play(engine: &FairnessEngine, req: &PlayRequest) -> Result<BottleFlipRound, GameError> {
    play_with_nonce(engine, &FairnessEngine::new_nonce(), req)
}

/// Validate the request and resolve a round for a given nonce.
pub fn play_with_nonce(
    engine: &FairnessEngine,
    nonce: &str,
    req: &PlayRequest,
) -> Result<BottleFlipRound, GameError> {
    let wager = WAGER_RULE.parse(req.wager.as_ref())?;
    let choice = parse_choice(req.choice.as_ref())?;

    let resolution = engine.resolve_with_nonce::<BottleSide>(nonce, None, req.client_seed());
    let won = resolution.result == choice;

    Ok(BottleFlipRound {
        round_id: resolution.nonce.clone(),
        outcome: resolution.result,
        choice,
        won,
        payout: payout(wager, won),
        server_seed_hash: resolution.server_seed_hash.clone(),
        proof_digest: resolution.proof_hex(),
        nonce: resolution.nonce,
        house_edge: HOUSE_EDGE_PCT,
        rtp: 100.0 - HOUSE_EDGE_PCT,
        timestamp: iso_timestamp(),
    })
}
