//! Server Configuration
//!
//! Everything is read from environment variables once at startup.
//! Invalid values are reported as [`ConfigError`] rather than silently
//! replaced by defaults.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::network::auth::AuthConfig;
use crate::network::chain::DEFAULT_RPC_URL;
use crate::network::gateway::GatewayConfig;
use crate::room::RoomTimings;

const DEFAULT_HTTP_PORT: u16 = 3001;
const DEFAULT_WS_ADDR: &str = "0.0.0.0:3002";

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API bind address.
    pub http_addr: SocketAddr,
    /// WebSocket gateway bind address.
    pub ws_addr: SocketAddr,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Idle WebSocket connections are closed after this long.
    pub idle_timeout: Duration,
    /// Shared room store; memory only when unset.
    pub redis_url: Option<String>,
    /// Base key prefix; rooms live at `{prefix}{namespace}:{roomId}`.
    pub room_key_prefix: String,
    /// Realtime namespaces, one room registry each.
    pub namespaces: Vec<String>,
    /// Phase windows and retention.
    pub timings: RoomTimings,
    /// Bound on each shared store operation.
    pub store_timeout: Duration,
    /// House contract address for the stats endpoints.
    pub house_address: Option<String>,
    /// JSON-RPC endpoint for contract reads.
    pub rpc_url: String,
    /// Bound on each contract read.
    pub rpc_timeout: Duration,
    /// Pinned bottle flip server seed.
    pub bottleflip_seed: Option<String>,
    /// Pinned dice server seed.
    pub dice_seed: Option<String>,
    /// Realtime authentication.
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.auth = AuthConfig::from_env();
        Ok(config)
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    /// Auth settings are left at their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_addr = match (var("HTTP_ADDR"), var("PORT")) {
            (Some(addr), _) => parse("HTTP_ADDR", &addr)?,
            (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], parse::<u16>("PORT", &port)?)),
            (None, None) => SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
        };
        let ws_addr = parse("WS_ADDR", &var("WS_ADDR").unwrap_or_else(|| DEFAULT_WS_ADDR.to_string()))?;

        let gateway_defaults = GatewayConfig::default();
        let max_connections = positive("MAX_CONNECTIONS", var("MAX_CONNECTIONS"), gateway_defaults.max_connections)?;
        let idle_timeout = Duration::from_secs(positive(
            "IDLE_TIMEOUT_SECS",
            var("IDLE_TIMEOUT_SECS"),
            gateway_defaults.idle_timeout.as_secs(),
        )?);

        let defaults = RoomTimings::default();
        let timings = RoomTimings {
            commit_window: Duration::from_secs(positive(
                "COMMIT_WINDOW_SECS",
                var("COMMIT_WINDOW_SECS"),
                defaults.commit_window.as_secs(),
            )?),
            reveal_window: Duration::from_secs(positive(
                "REVEAL_WINDOW_SECS",
                var("REVEAL_WINDOW_SECS"),
                defaults.reveal_window.as_secs(),
            )?),
            ttl_multiplier: positive("ROOM_TTL_MULTIPLIER", var("ROOM_TTL_MULTIPLIER"), defaults.ttl_multiplier)?,
        };

        let raw_namespaces = var("ROOM_NAMESPACES").unwrap_or_else(|| "coinflip".to_string());
        let namespaces = parse_namespaces(&raw_namespaces)?;

        Ok(Self {
            http_addr,
            ws_addr,
            max_connections,
            idle_timeout,
            redis_url: var("REDIS_URL"),
            room_key_prefix: var("ROOM_KEY_PREFIX").unwrap_or_else(|| "room:".to_string()),
            namespaces,
            timings,
            store_timeout: Duration::from_millis(positive("STORE_TIMEOUT_MS", var("STORE_TIMEOUT_MS"), 500)?),
            house_address: var("NEXT_PUBLIC_HOUSE_ADDRESS").or_else(|| var("HOUSE_ADDRESS")),
            rpc_url: var("RONIN_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            rpc_timeout: Duration::from_millis(positive("RPC_TIMEOUT_MS", var("RPC_TIMEOUT_MS"), 10_000)?),
            bottleflip_seed: var("BOTTLEFLIP_SERVER_SEED"),
            dice_seed: var("DICE_SERVER_SEED"),
            auth: AuthConfig::default(),
        })
    }

    /// Gateway settings derived from this configuration.
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            bind_addr: self.ws_addr,
            max_connections: self.max_connections,
            idle_timeout: self.idle_timeout,
            ..GatewayConfig::default()
        }
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => parse(var, &v),
        None => Ok(default),
    }
}

fn positive<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + Copy,
    T::Err: std::fmt::Display,
{
    let parsed = parse_or(var, value.clone(), default)?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.unwrap_or_default(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(parsed)
}

fn parse_namespaces(raw: &str) -> Result<Vec<String>, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: "ROOM_NAMESPACES",
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut namespaces: Vec<String> = Vec::new();
    for name in raw.split(',').map(|s| s.trim().trim_matches('/')).filter(|s| !s.is_empty()) {
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(invalid("names may only contain letters, digits, '-' and '_'"));
        }
        if !namespaces.iter().any(|n| n == name) {
            namespaces.push(name.to_string());
        }
    }
    if namespaces.is_empty() {
        return Err(invalid("at least one namespace is required"));
    }
    Ok(namespaces)
}
