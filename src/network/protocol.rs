//! Protocol Messages
//!
//! Wire format for the realtime room channel. Every frame is a JSON text
//! message tagged by `type`. Client requests may carry an `ack` number;
//! the server answers each of those with exactly one `ack` frame echoing it.

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::core::clock::Millis;
use crate::room::{PlayerId, Room, RoomError, RoomEvent, RoomId, RoomResult, RoomSummary};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// A client frame: the message plus its optional acknowledgement id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Acknowledgement id echoed in the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    /// The request.
    #[serde(flatten)]
    pub message: ClientMessage,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a room and take its first seat.
    CreateRoom {
        /// Stake, as a number or numeric string.
        #[serde(default)]
        wager: Option<Value>,
        /// Currency label; defaults to RON.
        #[serde(default)]
        currency: Option<String>,
    },

    /// Take the second seat of a waiting room.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        /// Target room.
        room_id: RoomId,
    },

    /// Commit to a seed: `commitment = sha256(seed)` as hex.
    #[serde(rename_all = "camelCase")]
    Commit {
        /// Target room.
        room_id: RoomId,
        /// Hex SHA-256 of the seed.
        commitment: String,
    },

    /// Reveal the committed seed.
    #[serde(rename_all = "camelCase")]
    Reveal {
        /// Target room.
        room_id: RoomId,
        /// The seed.
        seed: String,
    },

    /// List rooms waiting for an opponent.
    ListRooms,

    /// Authenticate with a JWT.
    Auth {
        /// Bearer token.
        token: String,
    },

    /// Latency probe.
    Ping {
        /// Client timestamp, echoed back.
        #[serde(default)]
        timestamp: u64,
    },
}

impl ClientMessage {
    /// Whether the message touches room state (and so needs auth when
    /// auth is enabled).
    pub fn is_room_operation(&self) -> bool {
        matches!(
            self,
            Self::CreateRoom { .. } | Self::JoinRoom { .. } | Self::Commit { .. } | Self::Reveal { .. }
        )
    }
}

impl ClientEnvelope {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Best-effort extraction of the `ack` id from a frame that failed to parse.
pub fn salvage_ack(text: &str) -> Option<u64> {
    serde_json::from_str::<Value>(text).ok()?.get("ack")?.as_u64()
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the handshake.
    Connected(Welcome),

    /// Reply to a client request carrying an `ack` id.
    Ack(Ack),

    /// Full room snapshot after a mutation.
    RoomUpdate {
        /// The room.
        room: Room,
    },

    /// Room entered the commit phase.
    #[serde(rename_all = "camelCase")]
    CommitPhase {
        /// Room identifier.
        room_id: RoomId,
        /// Commit deadline (Unix ms).
        deadline: Millis,
    },

    /// Room entered the reveal phase.
    #[serde(rename_all = "camelCase")]
    RevealPhase {
        /// Room identifier.
        room_id: RoomId,
        /// Reveal deadline (Unix ms).
        deadline: Millis,
    },

    /// Room settled.
    Result(RoomOutcome),

    /// Authentication result.
    AuthResult(AuthResult),

    /// Pong response.
    #[serde(rename_all = "camelCase")]
    Pong {
        /// Client timestamp from the ping.
        timestamp: u64,
        /// Server clock (Unix ms).
        server_time: u64,
    },

    /// Error not tied to an `ack` id.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Human-readable reason.
        reason: String,
    },
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::Updated(room) => Self::RoomUpdate { room },
            RoomEvent::CommitPhase { room_id, deadline } => Self::CommitPhase { room_id, deadline },
            RoomEvent::RevealPhase { room_id, deadline } => Self::RevealPhase { room_id, deadline },
            RoomEvent::Result { room_id, result } => Self::Result(RoomOutcome { room_id, result }),
        }
    }
}

/// Connection greeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    /// Identity used for this connection until `auth` replaces it.
    pub player_id: PlayerId,
    /// Namespace the connection is bound to.
    pub namespace: String,
    /// Whether room operations require `auth` first.
    pub auth_required: bool,
    /// Server version.
    pub server_version: String,
}

/// Acknowledgement of a client request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ack {
    /// Echoed acknowledgement id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    /// Whether the request was accepted.
    pub ok: bool,
    /// Room state after the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    /// Listing for `list_rooms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<RoomSummary>>,
    /// Rejection code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    /// Human-readable rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    /// Accepted with the resulting room.
    pub fn room(ack: Option<u64>, room: Room) -> Self {
        Self { ack, ok: true, room: Some(room), ..Default::default() }
    }

    /// Accepted with a room listing.
    pub fn rooms(ack: Option<u64>, rooms: Vec<RoomSummary>) -> Self {
        Self { ack, ok: true, rooms: Some(rooms), ..Default::default() }
    }

    /// Rejected.
    pub fn error(ack: Option<u64>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self { ack, ok: false, error: Some(code), message: Some(message.into()), ..Default::default() }
    }

    /// Rejected by the room layer.
    pub fn room_error(ack: Option<u64>, err: &RoomError) -> Self {
        Self::error(ack, ErrorCode::from(err), err.to_string())
    }
}

/// Settled room, as broadcast: `{ roomId, winnerId, proof, reason, error }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOutcome {
    /// Room identifier.
    pub room_id: RoomId,
    /// Final outcome.
    #[serde(flatten)]
    pub result: RoomResult,
}

/// Authentication result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Player id derived from the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server version.
    pub server_version: String,
}

/// Error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Room does not exist (or is not owned by this instance).
    NotFound,
    /// Room already has two players.
    RoomFull,
    /// Player already seated.
    AlreadyJoined,
    /// Player has no seat in the room.
    NotInRoom,
    /// Operation not valid in the room's phase.
    InvalidPhase,
    /// Commitment already recorded.
    AlreadyCommitted,
    /// Seed already revealed.
    AlreadyRevealed,
    /// Wager missing or not positive.
    InvalidWager,
    /// Commitment is not a hex SHA-256 digest.
    InvalidCommitment,
    /// Room operation attempted before `auth`.
    NotAuthenticated,
    /// Frame could not be parsed.
    InvalidMessage,
    /// Internal error.
    InternalError,
}

impl From<&RoomError> for ErrorCode {
    fn from(err: &RoomError) -> Self {
        match err {
            RoomError::NotFound => Self::NotFound,
            RoomError::RoomFull => Self::RoomFull,
            RoomError::AlreadyJoined => Self::AlreadyJoined,
            RoomError::NotInRoom => Self::NotInRoom,
            RoomError::InvalidPhase => Self::InvalidPhase,
            RoomError::AlreadyCommitted => Self::AlreadyCommitted,
            RoomError::AlreadyRevealed => Self::AlreadyRevealed,
            RoomError::InvalidWager => Self::InvalidWager,
            RoomError::InvalidCommitment => Self::InvalidCommitment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::room::{SettleReason, ResultError};

    #[test]
    fn test_parse_client_frames() {
        let env = ClientEnvelope::from_json(
            r#"{"type":"create_room","ack":7,"wager":"1.5","currency":"RON"}"#,
        ).unwrap();
        assert_eq!(env.ack, Some(7));
        match env.message {
            ClientMessage::CreateRoom { wager, currency } => {
                assert_eq!(wager, Some(json!("1.5")));
                assert_eq!(currency.as_deref(), Some("RON"));
            }
            other => panic!("Wrong message type: {:?}", other),
        }

        let env = ClientEnvelope::from_json(r#"{"type":"commit","roomId":"r1","commitment":"ab"}"#).unwrap();
        assert_eq!(env.ack, None);
        assert!(matches!(env.message, ClientMessage::Commit { ref room_id, .. } if room_id == "r1"));

        let env = ClientEnvelope::from_json(r#"{"type":"list_rooms","ack":1}"#).unwrap();
        assert!(matches!(env.message, ClientMessage::ListRooms));
    }

    #[test]
    fn test_rejects_unknown_or_incomplete_frames() {
        assert!(ClientEnvelope::from_json(r#"{"type":"leave"}"#).is_err());
        assert!(ClientEnvelope::from_json(r#"{"type":"join_room"}"#).is_err());
        assert!(ClientEnvelope::from_json("not json").is_err());

        assert_eq!(salvage_ack(r#"{"type":"join_room","ack":4}"#), Some(4));
        assert_eq!(salvage_ack("not json"), None);
    }

    #[test]
    fn test_room_operations_flagged() {
        let create = ClientMessage::CreateRoom { wager: None, currency: None };
        assert!(create.is_room_operation());
        assert!(!ClientMessage::ListRooms.is_room_operation());
        assert!(!ClientMessage::Ping { timestamp: 0 }.is_room_operation());
    }

    #[test]
    fn test_phase_frame_shape() {
        let msg = ServerMessage::from(RoomEvent::CommitPhase { room_id: "r1".into(), deadline: 42 });
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "commit_phase", "roomId": "r1", "deadline": 42}));
    }

    #[test]
    fn test_result_frame_is_flat() {
        let result = RoomResult {
            winner_id: None,
            proof: None,
            reason: SettleReason::TimeoutCommit,
            error: Some(ResultError::NoCommits),
            mismatched: Vec::new(),
        };

        let msg = ServerMessage::from(RoomEvent::Result { room_id: "r1".into(), result });
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({
            "type": "result",
            "roomId": "r1",
            "winnerId": null,
            "proof": null,
            "reason": "timeout-commit",
            "error": "no_commits",
        }));
    }

    #[test]
    fn test_ack_shapes() {
        let ok = ServerMessage::Ack(Ack::rooms(Some(3), Vec::new()));
        let value: Value = serde_json::from_str(&ok.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "ack", "ack": 3, "ok": true, "rooms": []}));

        let err = ServerMessage::Ack(Ack::room_error(None, &RoomError::RoomFull));
        let value: Value = serde_json::from_str(&err.to_json().unwrap()).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["error"], json!("room_full"));
        assert!(value.get("ack").is_none());
    }

    #[test]
    fn test_error_codes_match_room_codes() {
        let all = [
            RoomError::NotFound,
            RoomError::RoomFull,
            RoomError::AlreadyJoined,
            RoomError::NotInRoom,
            RoomError::InvalidPhase,
            RoomError::AlreadyCommitted,
            RoomError::AlreadyRevealed,
            RoomError::InvalidWager,
            RoomError::InvalidCommitment,
        ];
        for err in all {
            let code = serde_json::to_value(ErrorCode::from(&err)).unwrap();
            assert_eq!(code, json!(err.code()));
        }
    }
}
