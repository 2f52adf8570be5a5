//! Core primitives.
//!
//! Hashing and time helpers shared by the fairness engine, the room
//! state machine and the network layer.

pub mod clock;
pub mod hash;

// Re-export core types
pub use clock::{now_millis, iso_timestamp, Millis};
pub use hash::{Digest, PreimageHasher, sha256_hex};
