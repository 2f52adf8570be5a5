//! WebSocket Room Gateway
//!
//! Async WebSocket server for the realtime room protocol. The request
//! path selects the namespace (`/coinflip`, `/dice`, ...); each namespace
//! has its own [`RoomManager`]. Connections are routed to room actors and
//! receive their rooms' broadcasts.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, sleep_until, Instant};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::core::clock::now_millis;
use crate::room::{PlayerId, RoomEvent, RoomManager};
use super::auth::{authenticate, AuthConfig};
use super::protocol::{
    Ack, AuthResult, ClientEnvelope, ClientMessage, ErrorCode, ServerError, ServerMessage, Welcome,
    salvage_ack,
};

/// Outbound frames buffered per connection.
const OUTBOUND_BUFFER: usize = 64;

/// Room events buffered per connection.
const EVENT_BUFFER: usize = 64;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Close connections silent for this long.
    pub idle_timeout: Duration,
    /// How often finished room actors are swept from the registries.
    pub cleanup_interval: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3002)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(30),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// No namespaces configured.
    #[error("at least one room namespace is required")]
    NoNamespaces,
}

/// Connected client, for limits and logs.
struct ConnectedClient {
    player_id: PlayerId,
    namespace: String,
}

/// Per-connection state owned by the connection task.
struct Connection {
    addr: SocketAddr,
    player_id: PlayerId,
    authenticated: bool,
    manager: Arc<RoomManager>,
    events: mpsc::Sender<RoomEvent>,
}

/// The room gateway.
pub struct RoomGateway {
    config: GatewayConfig,
    auth: Arc<AuthConfig>,
    /// Managers by namespace name; the first one also serves `/`.
    namespaces: Arc<BTreeMap<String, Arc<RoomManager>>>,
    default_namespace: String,
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RoomGateway {
    /// Create a gateway over one manager per namespace.
    pub fn new(
        config: GatewayConfig,
        auth: AuthConfig,
        managers: Vec<Arc<RoomManager>>,
    ) -> Result<Self, GatewayError> {
        let default_namespace = managers
            .first()
            .map(|m| m.namespace().to_string())
            .ok_or(GatewayError::NoNamespaces)?;
        let namespaces = managers
            .into_iter()
            .map(|m| (m.namespace().to_string(), m))
            .collect();
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            auth: Arc::new(auth),
            namespaces: Arc::new(namespaces),
            default_namespace,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        })
    }

    /// Signal every connection and the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Bind the configured address and serve.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GatewayError> {
        info!(
            "Room gateway listening on {} (namespaces: {})",
            listener.local_addr()?,
            self.namespaces.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        let cleanup_namespaces = self.namespaces.clone();
        let cleanup_interval = self.config.cleanup_interval;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_namespaces, cleanup_interval).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Pick the namespace from the request path.
    fn resolve_namespace(
        namespaces: &BTreeMap<String, Arc<RoomManager>>,
        default_namespace: &str,
        path: &str,
    ) -> Option<Arc<RoomManager>> {
        let name = path.trim_matches('/');
        let name = if name.is_empty() { default_namespace } else { name };
        namespaces.get(name).cloned()
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let namespaces = self.namespaces.clone();
        let default_namespace = self.default_namespace.clone();
        let auth = self.auth.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut selected: Option<Arc<RoomManager>> = None;
            let handshake = accept_hdr_async(stream, |req: &Request, response: Response| {
                match Self::resolve_namespace(&namespaces, &default_namespace, req.uri().path()) {
                    Some(manager) => {
                        selected = Some(manager);
                        Ok(response)
                    }
                    None => {
                        let mut rejection = ErrorResponse::new(Some("unknown namespace".to_string()));
                        *rejection.status_mut() = StatusCode::NOT_FOUND;
                        Err(rejection)
                    }
                }
            })
            .await;

            let ws_stream = match handshake {
                Ok(ws) => ws,
                Err(e) => {
                    debug!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };
            let manager = match selected {
                Some(manager) => manager,
                None => return,
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
            let (event_tx, mut event_rx) = mpsc::channel::<RoomEvent>(EVENT_BUFFER);

            let mut conn = Connection {
                addr,
                player_id: Uuid::new_v4().to_string(),
                authenticated: !auth.is_configured(),
                manager,
                events: event_tx,
            };

            clients.write().await.insert(addr, ConnectedClient {
                player_id: conn.player_id.clone(),
                namespace: conn.manager.namespace().to_string(),
            });
            info!("Client {} connected to /{} as {}", addr, conn.manager.namespace(), conn.player_id);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let _ = msg_tx.send(ServerMessage::Connected(Welcome {
                player_id: conn.player_id.clone(),
                namespace: conn.manager.namespace().to_string(),
                auth_required: auth.is_configured(),
                server_version: config.version.clone(),
            })).await;

            let mut last_activity = Instant::now();

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                last_activity = Instant::now();
                                let reply = match ClientEnvelope::from_json(&text) {
                                    Ok(envelope) => {
                                        Self::handle_client_message(&mut conn, envelope, &auth, &config, &clients).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        Some(Self::invalid_message(salvage_ack(&text), e.to_string()))
                                    }
                                };
                                if let Some(reply) = reply {
                                    if msg_tx.send(reply).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                last_activity = Instant::now();
                                let _ = msg_tx.send(Self::invalid_message(None, "binary frames are not supported".into())).await;
                            }
                            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                                last_activity = Instant::now();
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    Some(event) = event_rx.recv() => {
                        if msg_tx.send(ServerMessage::from(event)).await.is_err() {
                            break;
                        }
                    }
                    _ = sleep_until(last_activity + config.idle_timeout) => {
                        info!("Client {} idle for {:?}, closing", addr, config.idle_timeout);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued frames (shutdown notice included) drain before closing.
            drop(msg_tx);
            drop(event_rx);
            if tokio::time::timeout(Duration::from_secs(1), sender_task).await.is_err() {
                debug!("Sender for {} did not drain in time", addr);
            }

            clients.write().await.remove(&addr);
            info!("Client {} cleaned up", conn.addr);
        });
    }

    fn invalid_message(ack: Option<u64>, details: String) -> ServerMessage {
        match ack {
            Some(_) => ServerMessage::Ack(Ack::error(ack, ErrorCode::InvalidMessage, details)),
            None => ServerMessage::Error(ServerError {
                code: ErrorCode::InvalidMessage,
                message: details,
            }),
        }
    }

    /// Handle a client message; returns the direct reply, if any.
    async fn handle_client_message(
        conn: &mut Connection,
        envelope: ClientEnvelope,
        auth: &AuthConfig,
        config: &GatewayConfig,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    ) -> Option<ServerMessage> {
        let ClientEnvelope { ack, message } = envelope;

        if message.is_room_operation() && !conn.authenticated {
            return Some(ServerMessage::Ack(Ack::error(
                ack,
                ErrorCode::NotAuthenticated,
                "Must authenticate first",
            )));
        }

        let manager = conn.manager.clone();
        let player = conn.player_id.clone();

        let reply = match message {
            ClientMessage::CreateRoom { wager, currency } => {
                match manager.create_room(player, wager.as_ref(), currency.as_deref(), Some(conn.events.clone())).await {
                    Ok(room) => Ack::room(ack, room),
                    Err(e) => Ack::room_error(ack, &e),
                }
            }
            ClientMessage::JoinRoom { room_id } => {
                match manager.join_room(&room_id, player, Some(conn.events.clone())).await {
                    Ok(room) => Ack::room(ack, room),
                    Err(e) => Ack::room_error(ack, &e),
                }
            }
            ClientMessage::Commit { room_id, commitment } => {
                match manager.commit(&room_id, player, commitment).await {
                    Ok(room) => Ack::room(ack, room),
                    Err(e) => Ack::room_error(ack, &e),
                }
            }
            ClientMessage::Reveal { room_id, seed } => {
                match manager.reveal(&room_id, player, seed).await {
                    Ok(room) => Ack::room(ack, room),
                    Err(e) => Ack::room_error(ack, &e),
                }
            }
            ClientMessage::ListRooms => Ack::rooms(ack, manager.list_rooms().await),
            ClientMessage::Auth { token } => {
                let result = Self::handle_auth(conn, &token, auth, config, clients).await;
                return Some(ServerMessage::AuthResult(result));
            }
            ClientMessage::Ping { timestamp } => {
                return Some(ServerMessage::Pong {
                    timestamp,
                    server_time: u64::try_from(now_millis()).unwrap_or_default(),
                });
            }
        };

        // Requests without an ack id get no direct reply; broadcasts still flow.
        if ack.is_none() && reply.ok {
            return None;
        }
        Some(ServerMessage::Ack(reply))
    }

    /// Handle authentication.
    async fn handle_auth(
        conn: &mut Connection,
        token: &str,
        auth: &AuthConfig,
        config: &GatewayConfig,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    ) -> AuthResult {
        let failure = |error: String| AuthResult {
            success: false,
            player_id: None,
            error: Some(error),
            server_version: config.version.clone(),
        };

        if !auth.is_configured() {
            return failure("authentication not configured".into());
        }
        if conn.authenticated {
            return failure("already authenticated".into());
        }

        match authenticate(token, auth) {
            Ok(player_id) => {
                conn.player_id = player_id.clone();
                conn.authenticated = true;
                if let Some(client) = clients.write().await.get_mut(&conn.addr) {
                    client.player_id = player_id.clone();
                }
                debug!("Client {} authenticated as {}", conn.addr, player_id);
                AuthResult {
                    success: true,
                    player_id: Some(player_id),
                    error: None,
                    server_version: config.version.clone(),
                }
            }
            Err(e) => {
                debug!("Client {} failed auth: {}", conn.addr, e);
                failure(e.to_string())
            }
        }
    }

    /// Periodically drop finished room actors.
    async fn run_cleanup_loop(namespaces: Arc<BTreeMap<String, Arc<RoomManager>>>, every: Duration) {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            for manager in namespaces.values() {
                let removed = manager.cleanup().await;
                if removed > 0 {
                    debug!("[{}] {} rooms retired, {} active", manager.namespace(), removed, manager.room_count().await);
                }
            }
        }
    }

    /// Connected players per namespace.
    pub async fn players_by_namespace(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for client in self.clients.read().await.values() {
            *counts.entry(client.namespace.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Whether `player` currently has an open connection.
    pub async fn is_connected(&self, player: &str) -> bool {
        self.clients.read().await.values().any(|c| c.player_id == player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio_tungstenite::connect_async;
    use crate::fairness::SeedCommitment;
    use crate::room::RoomTimings;
    use crate::store::MemoryRoomStore;

    type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

    fn manager(namespace: &str) -> Arc<RoomManager> {
        let timings = RoomTimings::default();
        Arc::new(RoomManager::new(namespace, Arc::new(MemoryRoomStore::new(timings.ttl())), timings))
    }

    async fn start(auth: AuthConfig) -> (Arc<RoomGateway>, SocketAddr) {
        let gateway = Arc::new(
            RoomGateway::new(GatewayConfig::default(), auth, vec![manager("coinflip"), manager("dice")]).unwrap(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serving = gateway.clone();
        tokio::spawn(async move { serving.serve(listener).await });
        (gateway, addr)
    }

    async fn connect(addr: SocketAddr, path: &str) -> (Client, Value) {
        let (mut ws, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
        let welcome = recv(&mut ws).await;
        (ws, welcome)
    }

    async fn send(ws: &mut Client, frame: Value) {
        ws.send(Message::Text(frame.to_string())).await.unwrap();
    }

    async fn recv(ws: &mut Client) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    /// Read frames until one of the given type arrives.
    async fn recv_type(ws: &mut Client, kind: &str) -> Value {
        loop {
            let frame = recv(ws).await;
            if frame["type"] == kind {
                return frame;
            }
        }
    }

    #[test]
    fn test_resolve_namespace() {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("coinflip".to_string(), manager("coinflip"));

        assert!(RoomGateway::resolve_namespace(&namespaces, "coinflip", "/coinflip").is_some());
        assert!(RoomGateway::resolve_namespace(&namespaces, "coinflip", "/").is_some());
        assert!(RoomGateway::resolve_namespace(&namespaces, "coinflip", "/coinflip/").is_some());
        assert!(RoomGateway::resolve_namespace(&namespaces, "coinflip", "/poker").is_none());
    }

    #[test]
    fn test_requires_a_namespace() {
        let result = RoomGateway::new(GatewayConfig::default(), AuthConfig::default(), Vec::new());
        assert!(matches!(result, Err(GatewayError::NoNamespaces)));
    }

    #[tokio::test]
    async fn test_unknown_namespace_rejected() {
        let (_gateway, addr) = start(AuthConfig::default()).await;
        assert!(connect_async(format!("ws://{}/poker", addr)).await.is_err());
    }

    #[tokio::test]
    async fn test_full_room_over_websocket() {
        let (gateway, addr) = start(AuthConfig::default()).await;
        let (mut alice, welcome) = connect(addr, "/coinflip").await;
        assert_eq!(welcome["type"], "connected");
        assert_eq!(welcome["namespace"], "coinflip");
        let alice_id = welcome["playerId"].as_str().unwrap().to_string();

        send(&mut alice, json!({"type": "create_room", "ack": 1, "wager": 1, "currency": "RON"})).await;
        let created = recv_type(&mut alice, "ack").await;
        assert_eq!(created["ack"], 1);
        assert_eq!(created["ok"], true);
        let room_id = created["room"]["id"].as_str().unwrap().to_string();

        let (mut bob, welcome) = connect(addr, "/coinflip").await;
        let bob_id = welcome["playerId"].as_str().unwrap().to_string();

        send(&mut bob, json!({"type": "list_rooms", "ack": 2})).await;
        let listing = recv_type(&mut bob, "ack").await;
        assert_eq!(listing["rooms"][0]["id"], room_id.as_str());

        send(&mut bob, json!({"type": "join_room", "ack": 3, "roomId": room_id})).await;
        assert_eq!(recv_type(&mut bob, "ack").await["ok"], true);
        assert_eq!(recv_type(&mut alice, "commit_phase").await["roomId"], room_id.as_str());

        for (ws, seed) in [(&mut alice, "seed-a"), (&mut bob, "seed-b")] {
            let commitment = SeedCommitment::for_seed(seed).as_str().to_string();
            send(ws, json!({"type": "commit", "ack": 4, "roomId": room_id, "commitment": commitment})).await;
            assert_eq!(recv_type(ws, "ack").await["ok"], true);
        }
        recv_type(&mut alice, "reveal_phase").await;

        send(&mut alice, json!({"type": "reveal", "ack": 5, "roomId": room_id, "seed": "seed-a"})).await;
        send(&mut bob, json!({"type": "reveal", "ack": 5, "roomId": room_id, "seed": "seed-b"})).await;

        let result = recv_type(&mut alice, "result").await;
        assert_eq!(result["roomId"], room_id.as_str());
        assert_eq!(result["reason"], "revealed");
        let winner = result["winnerId"].as_str().unwrap();
        assert!(winner == alice_id || winner == bob_id);
        assert_eq!(recv_type(&mut bob, "result").await["proof"], result["proof"]);

        assert_eq!(gateway.players_by_namespace().await.get("coinflip"), Some(&2));
        assert!(gateway.is_connected(&alice_id).await);
    }

    #[tokio::test]
    async fn test_rejections_are_acknowledged() {
        let (_gateway, addr) = start(AuthConfig::default()).await;
        let (mut ws, _) = connect(addr, "/dice").await;

        send(&mut ws, json!({"type": "join_room", "ack": 9, "roomId": "missing"})).await;
        let ack = recv_type(&mut ws, "ack").await;
        assert_eq!(ack["ok"], false);
        assert_eq!(ack["error"], "not_found");

        send(&mut ws, json!({"type": "create_room", "ack": 10, "wager": -1})).await;
        assert_eq!(recv_type(&mut ws, "ack").await["error"], "invalid_wager");

        send(&mut ws, json!({"type": "teleport", "ack": 11})).await;
        let ack = recv_type(&mut ws, "ack").await;
        assert_eq!(ack["ack"], 11);
        assert_eq!(ack["error"], "invalid_message");

        ws.send(Message::Text("garbage".into())).await.unwrap();
        assert_eq!(recv_type(&mut ws, "error").await["code"], "invalid_message");
    }

    #[tokio::test]
    async fn test_auth_required_for_room_operations() {
        let secret = "gateway-test-secret-0123456789!!";
        let (_gateway, addr) = start(AuthConfig { secret: Some(secret.into()), ..Default::default() }).await;
        let (mut ws, welcome) = connect(addr, "/coinflip").await;
        assert_eq!(welcome["authRequired"], true);

        send(&mut ws, json!({"type": "create_room", "ack": 1, "wager": 1})).await;
        assert_eq!(recv_type(&mut ws, "ack").await["error"], "not_authenticated");

        // listing stays open
        send(&mut ws, json!({"type": "list_rooms", "ack": 2})).await;
        assert_eq!(recv_type(&mut ws, "ack").await["ok"], true);

        let now = u64::try_from(now_millis() / 1000).unwrap();
        let claims = crate::network::auth::TokenClaims {
            sub: "user-1".into(),
            exp: now + 3600,
            iat: now,
            iss: None,
            aud: None,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        send(&mut ws, json!({"type": "auth", "token": token})).await;
        let result = recv_type(&mut ws, "auth_result").await;
        assert_eq!(result["success"], true);
        assert_eq!(result["playerId"], claims.player_id().as_str());

        send(&mut ws, json!({"type": "create_room", "ack": 3, "wager": 1})).await;
        let created = recv_type(&mut ws, "ack").await;
        assert_eq!(created["ok"], true);
        assert_eq!(created["room"]["players"][0]["id"], claims.player_id().as_str());
    }

    #[tokio::test]
    async fn test_shutdown_notifies_clients() {
        let (gateway, addr) = start(AuthConfig::default()).await;
        let (mut ws, _) = connect(addr, "/coinflip").await;

        gateway.shutdown();
        let frame = recv_type(&mut ws, "shutdown").await;
        assert_eq!(frame["reason"], "Server shutting down");
    }
}
