//! Room Manager
//!
//! Per-namespace registry of room actors. The gateway calls into the
//! manager; the manager routes each operation to the owning actor.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::clock::now_millis;
use crate::game::WagerRule;
use crate::store::RoomStore;
use super::RoomTimings;
use super::actor::{EventSender, RoomActor, RoomHandle};
use super::state::{PlayerId, Room, RoomError, RoomId, RoomSummary, MAX_PLAYERS};

/// Room wagers must be strictly positive.
const ROOM_WAGER: WagerRule = WagerRule { min: 0.0, inclusive: false };

/// Currency recorded when the creator names none.
pub const DEFAULT_CURRENCY: &str = "RON";

/// Registry of the rooms this instance owns for one namespace.
pub struct RoomManager {
    namespace: String,
    rooms: RwLock<BTreeMap<RoomId, RoomHandle>>,
    store: Arc<dyn RoomStore>,
    timings: RoomTimings,
}

impl RoomManager {
    /// Create an empty registry.
    pub fn new(namespace: impl Into<String>, store: Arc<dyn RoomStore>, timings: RoomTimings) -> Self {
        Self {
            namespace: namespace.into(),
            rooms: RwLock::new(BTreeMap::new()),
            store,
            timings,
        }
    }

    /// Namespace name (e.g. `coinflip`).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Phase windows in use.
    pub fn timings(&self) -> RoomTimings {
        self.timings
    }

    /// Create a room with `player` in the first seat.
    pub async fn create_room(
        &self,
        player: PlayerId,
        wager: Option<&Value>,
        currency: Option<&str>,
        events: Option<EventSender>,
    ) -> Result<Room, RoomError> {
        let wager = ROOM_WAGER.parse(wager).map_err(|_| RoomError::InvalidWager)?;
        let currency = currency
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();

        let room = Room::new(Uuid::new_v4().to_string(), wager, currency, player.clone(), now_millis());

        if let Err(e) = self.store.save(&room).await {
            warn!("[{}] Failed to persist new room {}: {}", self.namespace, room.id, e);
        }

        let handle = RoomActor::spawn(
            room.clone(),
            events.map(|tx| (player.clone(), tx)),
            self.store.clone(),
            self.timings,
        );
        self.rooms.write().await.insert(room.id.clone(), handle);

        info!("[{}] Room {} created by {} ({} {})", self.namespace, room.id, player, room.wager, room.currency);
        Ok(room)
    }

    /// Take the second seat of a room.
    ///
    /// Only rooms whose actor runs on this instance can be joined. A room
    /// that is listed in the shared store but owned elsewhere reports
    /// `not_found`, or `room_full` once it already has both players.
    pub async fn join_room(
        &self,
        room_id: &str,
        player: PlayerId,
        events: Option<EventSender>,
    ) -> Result<Room, RoomError> {
        match self.local(room_id).await {
            Some(handle) => handle.join(player, events).await,
            None => Err(self.missing(room_id).await),
        }
    }

    /// Record a player's seed commitment.
    pub async fn commit(&self, room_id: &str, player: PlayerId, commitment: String) -> Result<Room, RoomError> {
        self.owned(room_id).await?.commit(player, commitment).await
    }

    /// Record a player's revealed seed.
    pub async fn reveal(&self, room_id: &str, player: PlayerId, seed: String) -> Result<Room, RoomError> {
        self.owned(room_id).await?.reveal(player, seed).await
    }

    /// Rooms still waiting for an opponent, across every instance sharing
    /// the store.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        match self.store.list_waiting().await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!("[{}] Failed to list rooms: {}", self.namespace, e);
                Vec::new()
            }
        }
    }

    /// Current state of a room, from its local actor or the store.
    pub async fn get_room(&self, room_id: &str) -> Option<Room> {
        if let Some(handle) = self.local(room_id).await {
            if let Some(room) = handle.snapshot().await {
                return Some(room);
            }
        }
        self.store.get(room_id).await.ok().flatten()
    }

    /// Drop handles whose actors have exited. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, handle| !handle.is_closed());
        let removed = before - rooms.len();
        if removed > 0 {
            debug!("[{}] Cleaned up {} finished rooms", self.namespace, removed);
        }
        removed
    }

    /// Number of rooms with a registered actor.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    async fn local(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).filter(|h| !h.is_closed()).cloned()
    }

    async fn owned(&self, room_id: &str) -> Result<RoomHandle, RoomError> {
        self.local(room_id).await.ok_or(RoomError::NotFound)
    }

    async fn missing(&self, room_id: &str) -> RoomError {
        match self.store.get(room_id).await {
            Ok(Some(stored)) if stored.players.len() >= MAX_PLAYERS => RoomError::RoomFull,
            Ok(Some(_)) => {
                debug!("[{}] Room {} is owned by another instance", self.namespace, room_id);
                RoomError::NotFound
            }
            Ok(None) => RoomError::NotFound,
            Err(e) => {
                warn!("[{}] Store lookup for room {} failed: {}", self.namespace, room_id, e);
                RoomError::NotFound
            }
        }
    }
}
