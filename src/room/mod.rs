//! Peer-vs-Peer Rooms
//!
//! Two-player commit–reveal rounds.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  commands   ┌────────────┐  save   ┌───────────┐
//! │ RoomManager│────────────▶│ RoomActor  │────────▶│ RoomStore │
//! │ (registry) │  (mpsc)     │ (one task  │         └───────────┘
//! └────────────┘             │  per room) │  events
//!                            └────────────┘────────▶ subscribers
//! ```
//!
//! All mutations of one room are serialised through its actor, which also
//! owns the room's single phase timer. A room is authoritative only on the
//! instance that runs its actor; the store gives other instances
//! best-effort visibility but no locking.
//!
//! ## Module Structure
//!
//! - `state`: room data model and pure transitions
//! - `actor`: per-room task, timers, persistence, broadcasts
//! - `manager`: per-namespace registry and gateway-facing operations

pub mod actor;
pub mod manager;
pub mod state;

use std::time::Duration;

pub use actor::{RoomActor, RoomEvent, RoomHandle};
pub use manager::RoomManager;
pub use state::{
    Room, RoomError, RoomId, RoomPlayer, RoomResult, RoomStatus, RoomSummary,
    PlayerId, Phase, PhaseChange, ResultError, SettleReason, Transition,
};

/// Phase windows and retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomTimings {
    /// Time both players have to commit once the room is full.
    pub commit_window: Duration,
    /// Time both players have to reveal once both committed.
    pub reveal_window: Duration,
    /// Retention as a multiple of `commit_window + reveal_window`.
    pub ttl_multiplier: u32,
}

impl RoomTimings {
    /// How long a room is kept in the store, and how long a settled
    /// room's actor lingers before exiting.
    pub fn ttl(&self) -> Duration {
        (self.commit_window + self.reveal_window) * self.ttl_multiplier
    }
}

impl Default for RoomTimings {
    fn default() -> Self {
        Self {
            commit_window: Duration::from_secs(30),
            reveal_window: Duration::from_secs(30),
            ttl_multiplier: 6,
        }
    }
}
