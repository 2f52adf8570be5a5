//! Redis-backed room store shared across instances.

use std::time::Duration;
use async_trait::async_trait;
use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::debug;

use crate::room::{Room, RoomStatus, RoomSummary};
use super::{RoomStore, StoreError, room_key};

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

/// Room store over a lazily established Redis connection.
///
/// Every operation is bounded by `op_timeout`; an operation that finds
/// the server unreachable drops the connection so the next call reconnects.
pub struct RedisRoomStore {
    client: ::redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    prefix: String,
    ttl: Duration,
    op_timeout: Duration,
}

impl RedisRoomStore {
    /// Create a store. Does not connect until first use.
    pub fn new(url: &str, prefix: String, ttl: Duration, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix,
            ttl,
            op_timeout,
        })
    }

    /// A handle to the shared connection, established on first use.
    ///
    /// The lock only guards setup; commands run on a clone of the
    /// multiplexed manager so one slow listing never queues other calls.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_connection_manager().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset_connection(&self) {
        *self.connection.lock().await = None;
    }

    /// Run `op` on the connection within the operation timeout.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: for<'c> FnOnce(&'c mut ConnectionManager) -> futures_util::future::BoxFuture<'c, Result<T, StoreError>>,
    {
        let attempt = async {
            let mut conn = self.connection().await?;
            op(&mut conn).await
        };

        let result = match tokio::time::timeout(self.op_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        };
        if matches!(&result, Err(e) if e.is_unavailable()) {
            // start fresh next time
            self.reset_connection().await;
        }
        result
    }
}

/// Decode a stored room; entries that do not parse are treated as absent.
fn decode_room(json: &str) -> Option<Room> {
    match serde_json::from_str(json) {
        Ok(room) => Some(room),
        Err(e) => {
            debug!("Skipping undecodable room entry: {}", e);
            None
        }
    }
}

#[async_trait]
impl RoomStore for RedisRoomStore {
    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        let key = room_key(&self.prefix, &room.id);
        let value = serde_json::to_string(room)?;
        let ttl = self.ttl.as_secs().max(1);

        self.with_connection(move |conn| Box::pin(async move {
            let _: () = conn.set_ex(key, value, ttl).await?;
            Ok(())
        })).await
    }

    async fn get(&self, id: &str) -> Result<Option<Room>, StoreError> {
        let key = room_key(&self.prefix, id);

        let raw: Option<String> = self.with_connection(move |conn| Box::pin(async move {
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })).await?;

        Ok(raw.as_deref().and_then(decode_room))
    }

    async fn list_waiting(&self) -> Result<Vec<RoomSummary>, StoreError> {
        let pattern = format!("{}*", self.prefix);

        let values: Vec<Option<String>> = self.with_connection(move |conn| Box::pin(async move {
            let mut keys: Vec<String> = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = ::redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(conn)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }

            if keys.is_empty() {
                return Ok(Vec::new());
            }
            let values: Vec<Option<String>> = ::redis::cmd("MGET").arg(&keys).query_async(conn).await?;
            Ok(values)
        })).await?;

        Ok(values
            .iter()
            .flatten()
            .filter_map(|json| decode_room(json))
            .filter(|room| room.status == RoomStatus::Waiting)
            .map(|room| room.summary())
            .collect())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
