//! # Ronin Royale Server
//!
//! Provably-fair outcome engine and commit–reveal room server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RONIN ROYALE SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── hash.rs     - SHA-256 preimages and digests             │
//! │  └── clock.rs    - Wall-clock milliseconds, timestamps       │
//! │                                                              │
//! │  fairness/       - Verifiable outcomes (pure)                │
//! │  ├── engine.rs   - Server seed commitment, round digests     │
//! │  ├── outcome.rs  - Digest -> game value extraction           │
//! │  └── commitment.rs - Player seed commitments, winner proof   │
//! │                                                              │
//! │  game/           - Single-party games and payout policy      │
//! │  room/           - Two-player commit-reveal rooms            │
//! │  store/          - Room persistence (Redis, memory)          │
//! │                                                              │
//! │  network/        - Outer surfaces                            │
//! │  ├── gateway.rs  - WebSocket room protocol                   │
//! │  ├── http.rs     - HTTP API                                  │
//! │  └── chain.rs    - House contract reads                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Verifiability
//!
//! Everything under `fairness/` is a pure function of its inputs. Given a
//! revealed server seed, a round's nonce and tag, anyone can recompute the
//! digest and the outcome read from it. Room winners are recomputable from
//! the room id and both revealed player seeds.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod fairness;
pub mod game;
pub mod network;
pub mod room;
pub mod store;

// Re-export commonly used types
pub use config::{ServerConfig, ConfigError};
pub use fairness::{FairnessEngine, ServerSeed};
pub use room::{Room, RoomManager, RoomStatus, RoomTimings};
pub use store::{FallbackRoomStore, RoomStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
