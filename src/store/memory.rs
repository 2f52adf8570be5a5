//! In-memory room store with TTL expiry.

use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::room::{Room, RoomStatus, RoomSummary};
use super::{RoomStore, StoreError};

struct Entry {
    room: Room,
    expires_at: Instant,
}

/// Process-local store. Also the fallback for [`super::FallbackRoomStore`].
pub struct MemoryRoomStore {
    rooms: RwLock<BTreeMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryRoomStore {
    /// Create a store whose entries expire `ttl` after their last save.
    pub fn new(ttl: Duration) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            ttl,
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.rooms.read().await.values().filter(|e| e.expires_at > now).count()
    }

    /// Whether there are no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, e| e.expires_at > now);
        rooms.insert(room.id.clone(), Entry {
            room: room.clone(),
            expires_at: now + self.ttl,
        });
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Room>, StoreError> {
        let now = Instant::now();
        let rooms = self.rooms.read().await;
        Ok(rooms
            .get(id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.room.clone()))
    }

    async fn list_waiting(&self) -> Result<Vec<RoomSummary>, StoreError> {
        let now = Instant::now();
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|e| e.expires_at > now && e.room.status == RoomStatus::Waiting)
            .map(|e| e.room.summary())
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str) -> Room {
        Room::new(id.into(), 1.0, "RON".into(), "alice".into(), 0)
    }

    #[tokio::test]
    async fn test_save_get() {
        let store = MemoryRoomStore::new(Duration::from_secs(60));
        store.save(&room("a")).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().map(|r| r.id), Some("a".to_string()));
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_waiting_only() {
        let store = MemoryRoomStore::new(Duration::from_secs(60));
        store.save(&room("a")).await.unwrap();

        let mut settled = room("b");
        settled.status = RoomStatus::Settled;
        store.save(&settled).await.unwrap();

        let waiting = store.list_waiting().await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryRoomStore::new(Duration::from_secs(10));
        store.save(&room("a")).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(store.get("a").await.unwrap().is_some());

        // saving refreshes the TTL
        store.save(&room("a")).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.get("a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.list_waiting().await.unwrap().is_empty());
        assert!(store.is_empty().await);
    }
}
