//! Room Persistence
//!
//! Rooms are saved as JSON under `{prefix}{namespace}:{roomId}` with a
//! bounded TTL. The shared backend (Redis) gives other instances
//! visibility; when it is unreachable the [`FallbackRoomStore`] keeps
//! serving from local memory.
//!
//! Consistency is best-effort: there is no cross-instance locking, and a
//! room's state machine is only correct while all of its players talk to
//! the instance running its actor.

pub mod fallback;
pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::room::{Room, RoomSummary};

pub use fallback::FallbackRoomStore;
pub use memory::MemoryRoomStore;
pub use self::redis::RedisRoomStore;

/// Key-value storage for rooms.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Upsert a room, refreshing its TTL.
    async fn save(&self, room: &Room) -> Result<(), StoreError>;

    /// Fetch a room by id.
    async fn get(&self, id: &str) -> Result<Option<Room>, StoreError>;

    /// Summaries of every stored room still waiting for an opponent.
    async fn list_waiting(&self) -> Result<Vec<RoomSummary>, StoreError>;

    /// Backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Redis command or connection failure.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend did not answer in time.
    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl StoreError {
    /// Whether the backend itself is unreachable, as opposed to one bad
    /// command or value.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Redis(e) => {
                e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
            }
            StoreError::Timeout(_) => true,
            StoreError::Serialization(_) => false,
        }
    }
}

/// Full key for a room.
pub fn room_key(prefix: &str, id: &str) -> String {
    format!("{}{}", prefix, id)
}

/// Key prefix for a namespace: `{base}{namespace}:`.
pub fn namespace_prefix(base: &str, namespace: &str) -> String {
    format!("{}{}:", base, namespace)
}
