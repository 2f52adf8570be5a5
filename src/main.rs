//! Ronin Royale Server
//!
//! Serves the HTTP API for single-party rounds and the realtime room
//! gateway for two-player commit-reveal rooms.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use royale::{
    VERSION,
    config::ServerConfig,
    fairness::{FairnessEngine, ServerSeed},
    network::{
        chain::HouseClient,
        gateway::RoomGateway,
        http::{self, AppState, HttpApi},
    },
    room::RoomManager,
    store::{namespace_prefix, FallbackRoomStore, RedisRoomStore, RoomStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    info!("Ronin Royale Server v{}", VERSION);

    let bottleflip = Arc::new(FairnessEngine::new(ServerSeed::from_config(config.bottleflip_seed.as_deref())));
    let dice = Arc::new(FairnessEngine::new(ServerSeed::from_config(config.dice_seed.as_deref())));
    info!("Bottle flip server seed commitment: {}", bottleflip.commit());
    info!("Dice server seed commitment: {}", dice.commit());

    let house = match &config.house_address {
        Some(address) => Some(Arc::new(
            HouseClient::new(config.rpc_url.clone(), address.clone(), config.rpc_timeout)
                .context("failed to build house contract client")?,
        )),
        None => {
            warn!("No house contract address configured; stats endpoints will report house_not_configured");
            None
        }
    };

    let managers: Vec<Arc<RoomManager>> = config
        .namespaces
        .iter()
        .map(|namespace| Arc::new(RoomManager::new(namespace.clone(), room_store(&config, namespace), config.timings)))
        .collect();

    let gateway = Arc::new(RoomGateway::new(config.gateway(), config.auth.clone(), managers)?);
    if config.auth.is_configured() {
        info!("Realtime authentication enabled");
    }

    let gateway_task = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway.run().await {
                error!("Room gateway stopped: {}", e);
            }
        })
    };

    let router = HttpApi::new(AppState { bottleflip, dice, house }).router();
    let listener = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP API on {}", config.http_addr))?;

    let shutdown = {
        let gateway = gateway.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Shutdown requested");
            gateway.shutdown();
        }
    };

    http::serve(listener, router, shutdown).await.context("HTTP API failed")?;
    gateway_task.await.context("room gateway task panicked")?;

    info!("Server stopped");
    Ok(())
}

/// Store for one namespace: Redis with memory fallback, or memory only.
fn room_store(config: &ServerConfig, namespace: &str) -> Arc<dyn RoomStore> {
    let ttl = config.timings.ttl();
    let Some(url) = &config.redis_url else {
        return Arc::new(FallbackRoomStore::memory_only(ttl));
    };

    let prefix = namespace_prefix(&config.room_key_prefix, namespace);
    match RedisRoomStore::new(url, prefix, ttl, config.store_timeout) {
        Ok(redis) => Arc::new(FallbackRoomStore::new(Arc::new(redis), ttl)),
        Err(e) => {
            warn!("Invalid REDIS_URL for namespace {}: {}; using memory only", namespace, e);
            Arc::new(FallbackRoomStore::memory_only(ttl))
        }
    }
}
