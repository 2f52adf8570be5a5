//! Room State Machine
//!
//! Pure commit–reveal transitions for a two-player room. No I/O and no
//! timers: callers pass the current wall-clock time in and get back a
//! [`Transition`] describing what the mutation changed, which the room
//! actor turns into persistence, broadcasts, and timer changes.
//!
//! ```text
//! waiting --2nd join--> commit --both committed--> reveal --both revealed--> settled
//!                          |                          |
//!                          +--commit deadline-------> settled (timeout-commit)
//!                                                     +--reveal deadline--> settled (timeout-reveal)
//! ```

use serde::{Serialize, Deserialize};

use crate::core::clock::{Millis, deadline_after};
use crate::fairness::{SeedCommitment, draw_winner};
use super::RoomTimings;

/// Player identifier (connection UUID or derived from an auth token).
pub type PlayerId = String;

/// Room identifier (hyphenated UUID v4).
pub type RoomId = String;

/// Maximum players per room.
pub const MAX_PLAYERS: usize = 2;

/// Room lifecycle status. Ordered; a room only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// One player, waiting for an opponent.
    Waiting,
    /// Both players present, collecting commitments.
    Commit,
    /// Both committed, collecting seeds.
    Reveal,
    /// Terminal.
    Settled,
}

/// Phases that carry a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Commit window.
    Commit,
    /// Reveal window.
    Reveal,
}

impl Phase {
    fn status(self) -> RoomStatus {
        match self {
            Phase::Commit => RoomStatus::Commit,
            Phase::Reveal => RoomStatus::Reveal,
        }
    }
}

/// A seat in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    /// Player identifier.
    pub id: PlayerId,
    /// `sha256(seed)` committed during the commit phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<SeedCommitment>,
    /// Seed disclosed during the reveal phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_seed: Option<String>,
}

impl RoomPlayer {
    fn new(id: PlayerId) -> Self {
        Self { id, commitment: None, revealed_seed: None }
    }

    /// Whether the revealed seed opens the commitment.
    fn reveal_matches(&self) -> bool {
        match (&self.commitment, &self.revealed_seed) {
            (Some(c), Some(seed)) => c.opens(seed),
            _ => false,
        }
    }
}

/// How a room was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettleReason {
    /// Both players revealed matching seeds.
    Revealed,
    /// Commit window elapsed.
    TimeoutCommit,
    /// Reveal window elapsed.
    TimeoutReveal,
    /// A revealed seed did not open its commitment.
    CommitmentMismatch,
}

/// Error marker on a settled room without a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultError {
    /// Nobody committed in time.
    NoCommits,
    /// Nobody revealed in time.
    NoReveals,
    /// At least one revealed seed failed verification.
    CommitmentMismatch,
}

/// Outcome of a settled room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResult {
    /// Winning player, if any.
    pub winner_id: Option<PlayerId>,
    /// Hex winner digest `sha256(roomId ++ seed0 ++ seed1)`; only on full reveal.
    pub proof: Option<String>,
    /// How the room settled.
    pub reason: SettleReason,
    /// Set when the room settled without a winner.
    pub error: Option<ResultError>,
    /// Players whose seed failed verification.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatched: Vec<PlayerId>,
}

impl RoomResult {
    fn winner(id: PlayerId, reason: SettleReason) -> Self {
        Self { winner_id: Some(id), proof: None, reason, error: None, mismatched: Vec::new() }
    }

    fn failed(reason: SettleReason, error: ResultError) -> Self {
        Self { winner_id: None, proof: None, reason, error: Some(error), mismatched: Vec::new() }
    }

    fn mismatch(mismatched: Vec<PlayerId>) -> Self {
        Self {
            mismatched,
            ..Self::failed(SettleReason::CommitmentMismatch, ResultError::CommitmentMismatch)
        }
    }
}

/// Lightweight listing entry for a waiting room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room identifier.
    pub id: RoomId,
    /// Agreed stake.
    pub wager: f64,
    /// Stake currency.
    pub currency: String,
}

/// Shared state of one two-player match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Agreed stake.
    pub wager: f64,
    /// Stake currency.
    pub currency: String,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Seats in join order (at most two).
    pub players: Vec<RoomPlayer>,
    /// Commit deadline (Unix ms), set on entering `commit`.
    #[serde(default)]
    pub commit_deadline: Option<Millis>,
    /// Reveal deadline (Unix ms), set on entering `reveal`.
    #[serde(default)]
    pub reveal_deadline: Option<Millis>,
    /// Set exactly when `status == settled`.
    #[serde(default)]
    pub result: Option<RoomResult>,
    /// Creation time (Unix ms).
    pub created_at: Millis,
}

/// Phase entered by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    /// Entered `commit`.
    Commit {
        /// Commit deadline (Unix ms).
        deadline: Millis,
    },
    /// Entered `reveal`.
    Reveal {
        /// Reveal deadline (Unix ms).
        deadline: Millis,
    },
}

/// What an accepted mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Phase entered, if any.
    pub phase: Option<PhaseChange>,
    /// Whether the room reached `settled`.
    pub settled: bool,
}

impl Transition {
    fn entered(phase: PhaseChange) -> Self {
        Self { phase: Some(phase), settled: false }
    }

    fn settled() -> Self {
        Self { phase: None, settled: true }
    }
}

impl Room {
    /// Create a room with its creator in the first seat.
    pub fn new(id: RoomId, wager: f64, currency: String, creator: PlayerId, now: Millis) -> Self {
        Self {
            id,
            wager,
            currency,
            status: RoomStatus::Waiting,
            players: vec![RoomPlayer::new(creator)],
            commit_deadline: None,
            reveal_deadline: None,
            result: None,
            created_at: now,
        }
    }

    /// Listing entry.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            wager: self.wager,
            currency: self.currency.clone(),
        }
    }

    /// Whether a player holds a seat.
    pub fn has_player(&self, player: &str) -> bool {
        self.players.iter().any(|p| p.id == player)
    }

    /// Whether the room is terminal.
    pub fn is_settled(&self) -> bool {
        self.status == RoomStatus::Settled
    }

    fn player_mut(&mut self, player: &str) -> Result<&mut RoomPlayer, RoomError> {
        self.players
            .iter_mut()
            .find(|p| p.id == player)
            .ok_or(RoomError::NotInRoom)
    }

    fn require(&self, status: RoomStatus) -> Result<(), RoomError> {
        if self.status == status {
            Ok(())
        } else {
            Err(RoomError::InvalidPhase)
        }
    }

    fn settle(&mut self, result: RoomResult) -> Transition {
        self.status = RoomStatus::Settled;
        self.result = Some(result);
        Transition::settled()
    }

    /// Seat a second player. Filling the room opens the commit window.
    pub fn join(&mut self, player: PlayerId, now: Millis, timings: &RoomTimings) -> Result<Transition, RoomError> {
        if self.has_player(&player) {
            return Err(RoomError::AlreadyJoined);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }
        self.require(RoomStatus::Waiting)?;

        self.players.push(RoomPlayer::new(player));
        if self.players.len() < MAX_PLAYERS {
            return Ok(Transition::default());
        }

        let deadline = deadline_after(now, timings.commit_window);
        self.status = RoomStatus::Commit;
        self.commit_deadline = Some(deadline);
        Ok(Transition::entered(PhaseChange::Commit { deadline }))
    }

    /// Record a player's commitment. The second commitment opens the reveal window.
    pub fn commit(
        &mut self,
        player: &str,
        commitment: &str,
        now: Millis,
        timings: &RoomTimings,
    ) -> Result<Transition, RoomError> {
        if !self.has_player(player) {
            return Err(RoomError::NotInRoom);
        }
        self.require(RoomStatus::Commit)?;
        let commitment = SeedCommitment::parse(commitment).map_err(|_| RoomError::InvalidCommitment)?;

        let seat = self.player_mut(player)?;
        if seat.commitment.is_some() {
            return Err(RoomError::AlreadyCommitted);
        }
        seat.commitment = Some(commitment);

        if !self.players.iter().all(|p| p.commitment.is_some()) {
            return Ok(Transition::default());
        }

        let deadline = deadline_after(now, timings.reveal_window);
        self.status = RoomStatus::Reveal;
        self.reveal_deadline = Some(deadline);
        Ok(Transition::entered(PhaseChange::Reveal { deadline }))
    }

    /// Record a player's seed. The second reveal settles the room.
    ///
    /// Commitments are verified only once both seeds are in, and all of
    /// them are checked before anything is decided: any mismatch settles
    /// the room without a winner.
    pub fn reveal(&mut self, player: &str, seed: &str) -> Result<Transition, RoomError> {
        if !self.has_player(player) {
            return Err(RoomError::NotInRoom);
        }
        self.require(RoomStatus::Reveal)?;

        let seat = self.player_mut(player)?;
        if seat.revealed_seed.is_some() {
            return Err(RoomError::AlreadyRevealed);
        }
        seat.revealed_seed = Some(seed.to_string());

        if !self.players.iter().all(|p| p.revealed_seed.is_some()) {
            return Ok(Transition::default());
        }

        let mismatched = self.mismatched_players();
        if !mismatched.is_empty() {
            return Ok(self.settle(RoomResult::mismatch(mismatched)));
        }

        let seeds: Vec<&str> = self.players.iter().filter_map(|p| p.revealed_seed.as_deref()).collect();
        let proof = draw_winner(&self.id, seeds[0], seeds[1]);
        let winner = self.players[proof.winner_index].id.clone();

        Ok(self.settle(RoomResult {
            proof: Some(proof.proof_hex()),
            ..RoomResult::winner(winner, SettleReason::Revealed)
        }))
    }

    /// Resolve an elapsed phase window.
    ///
    /// Returns `None` without touching the room if it has already left
    /// `phase`, so a late timer is a no-op.
    pub fn expire(&mut self, phase: Phase) -> Option<Transition> {
        if self.status != phase.status() {
            return None;
        }

        let result = match phase {
            Phase::Commit => {
                let committed: Vec<&RoomPlayer> =
                    self.players.iter().filter(|p| p.commitment.is_some()).collect();
                match committed.as_slice() {
                    [only] => RoomResult::winner(only.id.clone(), SettleReason::TimeoutCommit),
                    _ => RoomResult::failed(SettleReason::TimeoutCommit, ResultError::NoCommits),
                }
            }
            Phase::Reveal => {
                let revealed: Vec<&RoomPlayer> =
                    self.players.iter().filter(|p| p.revealed_seed.is_some()).collect();
                match revealed.as_slice() {
                    [only] if only.reveal_matches() => {
                        RoomResult::winner(only.id.clone(), SettleReason::TimeoutReveal)
                    }
                    [only] => RoomResult::mismatch(vec![only.id.clone()]),
                    _ => RoomResult::failed(SettleReason::TimeoutReveal, ResultError::NoReveals),
                }
            }
        };

        Some(self.settle(result))
    }

    fn mismatched_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| !p.reveal_matches())
            .map(|p| p.id.clone())
            .collect()
    }
}

/// Client-facing room rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No such room.
    #[error("room not found")]
    NotFound,

    /// Room already has two players.
    #[error("room is full")]
    RoomFull,

    /// Player already seated in this room.
    #[error("already joined this room")]
    AlreadyJoined,

    /// Player has no seat in this room.
    #[error("not a player in this room")]
    NotInRoom,

    /// Operation not allowed in the room's current status.
    #[error("operation not allowed in the current phase")]
    InvalidPhase,

    /// Commitment already recorded.
    #[error("already committed")]
    AlreadyCommitted,

    /// Seed already revealed.
    #[error("already revealed")]
    AlreadyRevealed,

    /// Wager missing or not a positive number.
    #[error("wager must be a positive number")]
    InvalidWager,

    /// Commitment is not a hex SHA-256 digest.
    #[error("commitment must be a 64-character hex SHA-256 digest")]
    InvalidCommitment,
}

impl RoomError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RoomFull => "room_full",
            Self::AlreadyJoined => "already_joined",
            Self::NotInRoom => "not_in_room",
            Self::InvalidPhase => "invalid_phase",
            Self::AlreadyCommitted => "already_committed",
            Self::AlreadyRevealed => "already_revealed",
            Self::InvalidWager => "invalid_wager",
            Self::InvalidCommitment => "invalid_commitment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use proptest::prelude::*;

    const ROOM: &str = "00000000-0000-4000-8000-000000000001";
    const NOW: Millis = 1_700_000_000_000;

    fn timings() -> RoomTimings {
        RoomTimings {
            commit_window: Duration::from_secs(30),
            reveal_window: Duration::from_secs(20),
            ttl_multiplier: 6,
        }
    }

    fn waiting_room() -> Room {
        Room::new(ROOM.into(), 1.0, "RON".into(), "alice".into(), NOW)
    }

    fn full_room() -> Room {
        let mut room = waiting_room();
        room.join("bob".into(), NOW, &timings()).unwrap();
        room
    }

    fn commit(room: &mut Room, player: &str, seed: &str) -> Transition {
        let c = SeedCommitment::for_seed(seed);
        room.commit(player, c.as_str(), NOW, &timings()).unwrap()
    }

    fn revealing_room() -> Room {
        let mut room = full_room();
        commit(&mut room, "alice", "seed-a");
        commit(&mut room, "bob", "seed-b");
        room
    }

    #[test]
    fn test_new_room_waits() {
        let room = waiting_room();
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.players.len(), 1);
        assert!(room.result.is_none());
        assert_eq!(room.summary().id, ROOM);
    }

    #[test]
    fn test_second_join_opens_commit() {
        let mut room = waiting_room();
        let t = room.join("bob".into(), NOW, &timings()).unwrap();
        assert_eq!(t.phase, Some(PhaseChange::Commit { deadline: NOW + 30_000 }));
        assert_eq!(room.status, RoomStatus::Commit);
        assert_eq!(room.commit_deadline, Some(NOW + 30_000));
    }

    #[test]
    fn test_join_rejections() {
        let mut room = waiting_room();
        assert_eq!(room.join("alice".into(), NOW, &timings()), Err(RoomError::AlreadyJoined));

        let mut room = full_room();
        assert_eq!(room.join("carol".into(), NOW, &timings()), Err(RoomError::RoomFull));
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn test_commit_rules() {
        let mut room = waiting_room();
        let c = SeedCommitment::for_seed("x");
        assert_eq!(room.commit("alice", c.as_str(), NOW, &timings()), Err(RoomError::InvalidPhase));

        let mut room = full_room();
        assert_eq!(room.commit("carol", c.as_str(), NOW, &timings()), Err(RoomError::NotInRoom));
        assert_eq!(room.commit("alice", "zz", NOW, &timings()), Err(RoomError::InvalidCommitment));

        assert_eq!(commit(&mut room, "alice", "x"), Transition::default());
        assert_eq!(room.commit("alice", c.as_str(), NOW, &timings()), Err(RoomError::AlreadyCommitted));
        assert_eq!(room.status, RoomStatus::Commit);
    }

    #[test]
    fn test_second_commit_opens_reveal() {
        let mut room = full_room();
        commit(&mut room, "alice", "seed-a");
        let t = commit(&mut room, "bob", "seed-b");
        assert_eq!(t.phase, Some(PhaseChange::Reveal { deadline: NOW + 20_000 }));
        assert_eq!(room.status, RoomStatus::Reveal);
    }

    #[test]
    fn test_reveal_settles_with_winner() {
        let mut room = revealing_room();
        assert_eq!(room.reveal("alice", "seed-a").unwrap(), Transition::default());
        assert_eq!(room.reveal("alice", "seed-a"), Err(RoomError::AlreadyRevealed));

        let t = room.reveal("bob", "seed-b").unwrap();
        assert!(t.settled);
        assert_eq!(room.status, RoomStatus::Settled);

        let result = room.result.clone().unwrap();
        assert_eq!(result.reason, SettleReason::Revealed);
        // winner digest ends in 0x25 -> index 1
        assert_eq!(result.winner_id.as_deref(), Some("bob"));
        assert_eq!(
            result.proof.as_deref(),
            Some("b3093b132d7c2f6e847e46d3d34ffcb599eca9ee06224e7a0f27755376afd825")
        );
    }

    #[test]
    fn test_reveal_before_phase_rejected() {
        let mut room = full_room();
        assert_eq!(room.reveal("alice", "seed-a"), Err(RoomError::InvalidPhase));
    }

    #[test]
    fn test_mismatch_never_picks_winner() {
        let mut room = revealing_room();
        room.reveal("alice", "not-seed-a").unwrap();
        let t = room.reveal("bob", "seed-b").unwrap();
        assert!(t.settled);

        let result = room.result.unwrap();
        assert_eq!(result.winner_id, None);
        assert_eq!(result.reason, SettleReason::CommitmentMismatch);
        assert_eq!(result.error, Some(ResultError::CommitmentMismatch));
        assert_eq!(result.mismatched, vec!["alice".to_string()]);
    }

    #[test]
    fn test_mismatch_reports_both_players() {
        let mut room = revealing_room();
        room.reveal("bob", "wrong-b").unwrap();
        room.reveal("alice", "wrong-a").unwrap();
        let result = room.result.unwrap();
        assert_eq!(result.mismatched, vec!["alice".to_string(), "bob".to_string()]);
        assert!(result.winner_id.is_none());
    }

    #[test]
    fn test_commit_timeout_sole_committer_wins() {
        let mut room = full_room();
        commit(&mut room, "bob", "seed-b");
        let t = room.expire(Phase::Commit).unwrap();
        assert!(t.settled);

        let result = room.result.unwrap();
        assert_eq!(result.winner_id.as_deref(), Some("bob"));
        assert_eq!(result.reason, SettleReason::TimeoutCommit);
        assert!(result.proof.is_none());
    }

    #[test]
    fn test_commit_timeout_without_commits() {
        let mut room = full_room();
        room.expire(Phase::Commit).unwrap();
        let result = room.result.unwrap();
        assert_eq!(result.winner_id, None);
        assert_eq!(result.error, Some(ResultError::NoCommits));
    }

    #[test]
    fn test_reveal_timeout_outcomes() {
        let mut room = revealing_room();
        room.reveal("alice", "seed-a").unwrap();
        room.expire(Phase::Reveal).unwrap();
        let result = room.result.unwrap();
        assert_eq!(result.winner_id.as_deref(), Some("alice"));
        assert_eq!(result.reason, SettleReason::TimeoutReveal);

        let mut room = revealing_room();
        room.expire(Phase::Reveal).unwrap();
        assert_eq!(room.result.unwrap().error, Some(ResultError::NoReveals));

        let mut room = revealing_room();
        room.reveal("alice", "bogus").unwrap();
        room.expire(Phase::Reveal).unwrap();
        let result = room.result.unwrap();
        assert_eq!(result.winner_id, None);
        assert_eq!(result.reason, SettleReason::CommitmentMismatch);
        assert_eq!(result.mismatched, vec!["alice".to_string()]);
    }

    #[test]
    fn test_stale_timer_is_noop() {
        let mut room = revealing_room();
        let before = room.clone();
        assert_eq!(room.expire(Phase::Commit), None);
        assert_eq!(room, before);

        room.reveal("alice", "seed-a").unwrap();
        room.reveal("bob", "seed-b").unwrap();
        let settled = room.clone();
        assert_eq!(room.expire(Phase::Commit), None);
        assert_eq!(room.expire(Phase::Reveal), None);
        assert_eq!(room, settled);
    }

    #[test]
    fn test_waiting_room_never_expires() {
        let mut room = waiting_room();
        assert_eq!(room.expire(Phase::Commit), None);
        assert_eq!(room.expire(Phase::Reveal), None);
        assert_eq!(room.status, RoomStatus::Waiting);
    }

    #[test]
    fn test_wire_shape() {
        let mut room = revealing_room();
        room.reveal("alice", "seed-a").unwrap();
        room.reveal("bob", "seed-b").unwrap();

        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(value["status"], "settled");
        assert_eq!(value["result"]["reason"], "revealed");
        assert_eq!(value["result"]["winnerId"], "bob");
        assert!(value["players"][0]["revealedSeed"].is_string());
        assert!(value.get("commitDeadline").is_some());

        let back: Room = serde_json::from_value(value).unwrap();
        assert_eq!(back, room);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RoomError::NotFound.code(), "not_found");
        assert_eq!(RoomError::RoomFull.code(), "room_full");
        assert_eq!(RoomError::InvalidCommitment.code(), "invalid_commitment");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(u8),
        Commit(u8),
        Reveal(u8, bool),
        Expire(bool),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..3).prop_map(Op::Join),
            (0u8..3).prop_map(Op::Commit),
            (0u8..3, any::<bool>()).prop_map(|(p, ok)| Op::Reveal(p, ok)),
            any::<bool>().prop_map(Op::Expire),
        ]
    }

    const NAMES: [&str; 3] = ["alice", "bob", "carol"];

    proptest! {
        #[test]
        fn prop_room_invariants(ops in proptest::collection::vec(op(), 0..24)) {
            let mut room = waiting_room();
            let mut status = room.status;

            for op in ops {
                match op {
                    Op::Join(p) => { let _ = room.join(NAMES[p as usize].into(), NOW, &timings()); }
                    Op::Commit(p) => {
                        let name = NAMES[p as usize];
                        let c = SeedCommitment::for_seed(name);
                        let _ = room.commit(name, c.as_str(), NOW, &timings());
                    }
                    Op::Reveal(p, honest) => {
                        let name = NAMES[p as usize];
                        let seed = if honest { name.to_string() } else { format!("{}-lie", name) };
                        let _ = room.reveal(name, &seed);
                    }
                    Op::Expire(commit) => {
                        let _ = room.expire(if commit { Phase::Commit } else { Phase::Reveal });
                    }
                }

                prop_assert!(room.players.len() <= MAX_PLAYERS);
                prop_assert!(room.status >= status);
                prop_assert_eq!(room.result.is_some(), room.is_settled());
                if let Some(result) = &room.result {
                    if !result.mismatched.is_empty() {
                        prop_assert!(result.winner_id.is_none());
                    }
                    if let Some(winner) = &result.winner_id {
                        prop_assert!(room.has_player(winner));
                        let seat = room.players.iter().find(|p| &p.id == winner).unwrap();
                        prop_assert!(seat.commitment.is_some());
                    }
                }
                status = room.status;
            }
        }
    }
}
