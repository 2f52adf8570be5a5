//! Dice Roll
//!
//! Player and house each roll three dice; the higher total wins.
//! Win pays 2x, a tie refunds the stake, a loss pays nothing.
//!
//! Dice for hand `tag` come from the tagged digests `"{tag}:1"`..`"{tag}:3"`
//! (see [`crate::fairness::roll_three`]). The published proof digest binds
//! both hands to the round: `sha256(secret ":" nonce ":" p1,p2,p3 ":" c1,c2,c3)`.

use serde::Serialize;

use crate::core::clock::iso_timestamp;
use crate::fairness::{Die, FairnessEngine, roll_three, hand_total};
use super::{GameError, PlayRequest, WagerRule, round4};

/// Minimum stake.
pub const MIN_WAGER: f64 = 0.01;

/// Stake must be at least [`MIN_WAGER`].
pub const WAGER_RULE: WagerRule = WagerRule { min: MIN_WAGER, inclusive: true };

/// Hand tags.
pub const PLAYER_TAG: &str = "player";
/// House hand tag.
pub const CPU_TAG: &str = "cpu";

/// Round result from the player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceOutcome {
    /// Player total higher.
    Win,
    /// House total higher.
    Lose,
    /// Equal totals.
    Tie,
}

/// One hand of three dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hand {
    /// Face values in roll order.
    pub dice: [u8; 3],
    /// Sum of faces.
    pub total: u32,
}

impl Hand {
    fn new(dice: [Die; 3]) -> Self {
        Self {
            total: hand_total(&dice),
            dice: dice.map(Die::value),
        }
    }

    fn csv(&self) -> String {
        self.dice.iter().map(u8::to_string).collect::<Vec<_>>().join(",")
    }
}

/// Settled dice round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRound {
    /// Round identifier (same as the nonce).
    pub round_id: String,
    /// Result for the player.
    pub outcome: DiceOutcome,
    /// `outcome == win`.
    pub won: bool,
    /// Amount returned to the player.
    pub payout: f64,
    /// Standing server seed commitment.
    pub server_seed_hash: String,
    /// Round nonce.
    pub nonce: String,
    /// Digest binding both hands to the round.
    pub proof_digest: String,
    /// Player's hand.
    pub player: Hand,
    /// House hand.
    pub cpu: Hand,
    /// Accepted stake.
    pub wager: f64,
    /// Resolution time.
    pub timestamp: String,
}

/// Payout policy.
pub fn payout(wager: f64, outcome: DiceOutcome) -> f64 {
    match outcome {
        DiceOutcome::Win => round4(wager * 2.0),
        DiceOutcome::Tie => round4(wager),
        DiceOutcome::Lose => 0.0,
    }
}

/// Validate the request and roll with a fresh nonce.
pub fn roll(engine: &FairnessEngine, req: &PlayRequest) -> Result<DiceRound, GameError> {
    roll_with_nonce(engine, FairnessEngine::new_nonce(), req)
}

/// Validate the request and roll for a given nonce.
pub fn roll_with_nonce(
    engine: &FairnessEngine,
    nonce: String,
    req: &PlayRequest,
) -> Result<DiceRound, GameError> {
    let wager = WAGER_RULE.parse(req.wager.as_ref())?;

    let round = engine.round_with_nonce(nonce, req.client_seed());
    let player = Hand::new(roll_three(PLAYER_TAG, |tag| round.digest(tag)));
    let cpu = Hand::new(roll_three(CPU_TAG, |tag| round.digest(tag)));

    let outcome = match player.total.cmp(&cpu.total) {
        std::cmp::Ordering::Greater => DiceOutcome::Win,
        std::cmp::Ordering::Less => DiceOutcome::Lose,
        std::cmp::Ordering::Equal => DiceOutcome::Tie,
    };

    let proof_digest = hex::encode(round.bind(&[&player.csv(), &cpu.csv()]));

    Ok(DiceRound {
        round_id: round.nonce().to_string(),
        outcome,
        won: outcome == DiceOutcome::Win,
        payout: payout(wager, outcome),
        server_seed_hash: round.server_seed_hash().to_string(),
        nonce: round.nonce().to_string(),
        proof_digest,
        player,
        cpu,
        wager,
        timestamp: iso_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::sha256_hex;
    use crate::fairness::ServerSeed;
    use serde_json::json;

    fn engine() -> FairnessEngine {
        FairnessEngine::new(ServerSeed::pinned("abc"))
    }

    fn request(wager: serde_json::Value) -> PlayRequest {
        PlayRequest {
            wager: Some(wager),
            ..Default::default()
        }
    }

    #[test]
    fn test_known_roll() {
        let round = roll_with_nonce(&engine(), "01".into(), &request(json!(1))).unwrap();

        assert_eq!(round.player.dice, [4, 6, 1]);
        assert_eq!(round.player.total, 11);
        assert_eq!(round.cpu.dice, [6, 5, 5]);
        assert_eq!(round.cpu.total, 16);
        assert_eq!(round.outcome, DiceOutcome::Lose);
        assert!(!round.won);
        assert_eq!(round.payout, 0.0);
        assert_eq!(round.proof_digest, sha256_hex("abc:01:4,6,1:6,5,5"));
    }

    #[test]
    fn test_payout_policy() {
        assert_eq!(payout(1.5, DiceOutcome::Win), 3.0);
        assert_eq!(payout(1.5, DiceOutcome::Tie), 1.5);
        assert_eq!(payout(1.5, DiceOutcome::Lose), 0.0);
    }

    #[test]
    fn test_minimum_wager() {
        let err = roll(&engine(), &request(json!(0.001))).unwrap_err();
        assert_eq!(err, GameError::InvalidWager { min: MIN_WAGER });
        assert!(roll(&engine(), &request(json!(0.01))).is_ok());
    }

    #[test]
    fn test_roll_deterministic_for_nonce() {
        let a = roll_with_nonce(&engine(), "beef".into(), &request(json!(1))).unwrap();
        let b = roll_with_nonce(&engine(), "beef".into(), &request(json!(1))).unwrap();
        assert_eq!(a.player, b.player);
        assert_eq!(a.cpu, b.cpu);
        assert_eq!(a.proof_digest, b.proof_digest);
    }

    #[test]
    fn test_fresh_rolls_are_well_formed() {
        for _ in 0..50 {
            let round = roll(&engine(), &request(json!(2))).unwrap();
            assert!(round.player.dice.iter().all(|d| (1..=6).contains(d)));
            assert_eq!(round.won, round.outcome == DiceOutcome::Win);
            assert_eq!(round.round_id, round.nonce);
        }
    }

    #[test]
    fn test_wire_shape() {
        let round = roll_with_nonce(&engine(), "01".into(), &request(json!(1))).unwrap();
        let value = serde_json::to_value(&round).unwrap();
        assert_eq!(value["outcome"], "lose");
        assert_eq!(value["player"]["dice"], json!([4, 6, 1]));
        assert!(value.get("proofDigest").is_some());
        assert!(value.get("serverSeedHash").is_some());
    }
}
