//! Degrading store decorator.
//!
//! Writes go to local memory and, while healthy, to the shared store.
//! The first failure that shows the shared store is unreachable switches
//! the decorator to memory-only for the rest of the process and logs a
//! single warning. Other shared-store errors (a rejected command, a value
//! that does not decode) are logged and answered from local memory
//! without degrading. Callers never see an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::room::{Room, RoomSummary};
use super::{MemoryRoomStore, RoomStore, StoreError};

/// Shared store with an in-memory fallback.
pub struct FallbackRoomStore {
    shared: Option<Arc<dyn RoomStore>>,
    local: MemoryRoomStore,
    degraded: AtomicBool,
}

impl FallbackRoomStore {
    /// Wrap a shared store.
    pub fn new(shared: Arc<dyn RoomStore>, ttl: Duration) -> Self {
        info!("Room store backend: {} with memory fallback", shared.backend());
        Self {
            shared: Some(shared),
            local: MemoryRoomStore::new(ttl),
            degraded: AtomicBool::new(false),
        }
    }

    /// Memory only; no shared store configured.
    pub fn memory_only(ttl: Duration) -> Self {
        info!("Room store backend: memory only");
        Self {
            shared: None,
            local: MemoryRoomStore::new(ttl),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the shared store has been abandoned.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn healthy_shared(&self) -> Option<&Arc<dyn RoomStore>> {
        if self.is_degraded() {
            None
        } else {
            self.shared.as_ref()
        }
    }

    fn shared_failed(&self, op: &str, err: &StoreError) {
        if !err.is_unavailable() {
            debug!("Shared room store {} failed: {}; answering from local memory", op, err);
            return;
        }
        if self
            .degraded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!("Shared room store unavailable ({} failed: {}); continuing with local memory only", op, err);
        }
    }
}

#[async_trait]
impl RoomStore for FallbackRoomStore {
    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        self.local.save(room).await?;
        if let Some(shared) = self.healthy_shared() {
            if let Err(e) = shared.save(room).await {
                self.shared_failed("save", &e);
            }
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Room>, StoreError> {
        if let Some(shared) = self.healthy_shared() {
            match shared.get(id).await {
                Ok(Some(room)) => return Ok(Some(room)),
                Ok(None) => {}
                Err(e) => self.shared_failed("get", &e),
            }
        }
        self.local.get(id).await
    }

    async fn list_waiting(&self) -> Result<Vec<RoomSummary>, StoreError> {
        if let Some(shared) = self.healthy_shared() {
            match shared.list_waiting().await {
                Ok(rooms) => return Ok(rooms),
                Err(e) => self.shared_failed("list", &e),
            }
        }
        self.local.list_waiting().await
    }

    fn backend(&self) -> &'static str {
        match self.healthy_shared() {
            Some(shared) => shared.backend(),
            None => self.local.backend(),
        }
    }
}
