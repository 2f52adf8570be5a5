//! Provable Fairness
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FAIRNESS CORE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  engine.rs      - Server seed commitment, round digests     │
//! │  outcome.rs     - Digest -> game value extraction           │
//! │  commitment.rs  - Player seed commit/reveal, winner proof   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod engine;
pub mod outcome;

// Re-export key types
pub use commitment::{SeedCommitment, WinnerProof, CommitmentError, draw_winner, verify_reveal};
pub use engine::{FairnessEngine, ServerSeed, Resolution, Round, verify_commitment, verify_round};
pub use outcome::{Extract, BottleSide, Die, roll_three, hand_total};
