//! Network Layer
//!
//! Outer surfaces of the server. Nothing here decides an outcome; rounds
//! are resolved by `fairness/` and `game/`, rooms by `room/`.
//!
//! - `gateway`: realtime WebSocket room protocol, one namespace per path
//! - `protocol`: realtime wire messages
//! - `auth`: optional JWT authentication for realtime connections
//! - `http`: HTTP API (single-party rounds, health, house stats)
//! - `chain`: read-only house contract client

pub mod auth;
pub mod chain;
pub mod gateway;
pub mod http;
pub mod protocol;

pub use auth::{AuthConfig, TokenClaims, AuthError, authenticate, validate_token};
pub use chain::{ChainError, HouseClient, HouseStats};
pub use gateway::{RoomGateway, GatewayConfig, GatewayError};
pub use http::{AppState, ApiError, HttpApi};
pub use protocol::{ClientEnvelope, ClientMessage, ServerMessage, ErrorCode};
