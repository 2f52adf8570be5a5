//! HTTP API
//!
//! Single-party rounds, health checks, house statistics and the retired
//! settlement endpoints. Every failure is a JSON body with a non-2xx
//! status; panics inside a round become `<verb>_failed`.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::core::clock::iso_timestamp;
use crate::fairness::FairnessEngine;
use crate::game::{bottleflip, dice, GameError, PlayRequest};
use super::chain::{ChainError, HouseClient};

const BACKEND_MESSAGE: &str = "Ronin Royale Backend";
const COINFLIP_HEALTH: &str = "Coinflip API is running - Single player games now handled entirely on-chain!";
const BOTTLEFLIP_HEALTH: &str = "Bottle Flip API is running - Backend RNG mode (pre-contract)";
const DICE_HEALTH: &str = "Dice Roll API is running (off-chain RNG MVP)";
const SIGNATURES_RETIRED: &str =
    "Settlement signatures are no longer needed. The new contract handles everything in one transaction.";
const USE_FLIP: &str =
    "Use the smart contract flip() function which handles betting, randomness, and payout in a single transaction.";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Engine for bottle flip rounds.
    pub bottleflip: Arc<FairnessEngine>,
    /// Engine for dice rounds.
    pub dice: Arc<FairnessEngine>,
    /// House contract reader, when an address is configured.
    pub house: Option<Arc<HouseClient>>,
}

/// Handler errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request failed validation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A round could not be resolved.
    #[error("{verb} failed: {details}")]
    Failed {
        /// Operation name, e.g. `spin`.
        verb: &'static str,
        /// What went wrong.
        details: String,
    },

    /// No house contract address.
    #[error("House contract address not configured")]
    HouseNotConfigured,

    /// Contract read failed.
    #[error("Failed to fetch house statistics")]
    Stats(#[from] ChainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Game(err) => {
                let mut body = json!({ "error": err.code(), "message": err.to_string() });
                if let GameError::InvalidWager { min } = err {
                    if *min > 0.0 {
                        body["min"] = json!(min);
                    }
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::Failed { verb, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("{}_failed", verb), "details": details }),
            ),
            ApiError::HouseNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "house_not_configured", "message": self.to_string() }),
            ),
            ApiError::Stats(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "stats_failed", "message": self.to_string(), "details": err.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// The HTTP API.
pub struct HttpApi {
    state: AppState,
}

impl HttpApi {
    /// Create the API over shared state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with CORS, tracing and panic recovery.
    pub fn router(&self) -> Router {
        let cors_layer = CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(cors::Any);

        let coinflip = Router::new()
            .route("/health", get(coinflip_health))
            .route("/stats", get(house_stats))
            .route("/play", post(coinflip_play_retired))
            .route("/sign", post(sign_retired));

        let bottleflip = Router::new()
            .route("/health", get(bottleflip_health))
            .route("/stats", get(house_stats))
            .route("/spin", post(bottleflip_spin))
            .route("/play", post(bottleflip_play))
            .route("/sign", post(bottleflip_sign_retired));

        let dice = Router::new()
            .route("/health", get(dice_health))
            .route("/roll", post(dice_roll));

        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .nest("/api/coinflip", coinflip)
            .nest("/api/bottleflip", bottleflip)
            .nest("/api/dice", dice)
            .with_state(self.state.clone())
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(cors_layer)
            .layer(TraceLayer::new_for_http())
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP API listening on {}", addr);
    }
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic_message(payload.as_ref());
    error!("Request handler panicked: {}", details);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "request_failed", "details": details })),
    )
        .into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}

/// Run a round, turning a panic into `<verb>_failed`.
fn resolve<T, F>(verb: &'static str, round: F) -> Result<Json<T>, ApiError>
where
    T: Serialize,
    F: FnOnce() -> Result<T, GameError>,
{
    match catch_unwind(AssertUnwindSafe(round)) {
        Ok(result) => Ok(Json(result?)),
        Err(payload) => {
            let details = panic_message(payload.as_ref());
            error!("{} failed: {}", verb, details);
            Err(ApiError::Failed { verb, details })
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn root() -> Json<Value> {
    Json(json!({ "message": BACKEND_MESSAGE, "version": env!("CARGO_PKG_VERSION") }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": BACKEND_MESSAGE, "timestamp": iso_timestamp() }))
}

async fn coinflip_health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": COINFLIP_HEALTH, "timestamp": iso_timestamp() }))
}

async fn bottleflip_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": BOTTLEFLIP_HEALTH,
        "timestamp": iso_timestamp(),
        "game": "bottle-flip",
        "serverSeedHash": state.bottleflip.commit(),
    }))
}

async fn dice_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": DICE_HEALTH,
        "timestamp": iso_timestamp(),
        "serverSeedHash": state.dice.commit(),
    }))
}

async fn bottleflip_spin(State(state): State<AppState>, body: Bytes) -> Result<Json<bottleflip::BottleFlipRound>, ApiError> {
    let req = PlayRequest::from_body(&body);
    resolve("spin", || bottleflip::play(&state.bottleflip, &req))
}

async fn bottleflip_play(State(state): State<AppState>, body: Bytes) -> Result<Json<bottleflip::BottleFlipRound>, ApiError> {
    let req = PlayRequest::from_body(&body);
    resolve("play", || bottleflip::play(&state.bottleflip, &req))
}

async fn dice_roll(State(state): State<AppState>, body: Bytes) -> Result<Json<dice::DiceRound>, ApiError> {
    let req = PlayRequest::from_body(&body);
    resolve("roll", || dice::roll(&state.dice, &req))
}

async fn house_stats(State(state): State<AppState>) -> Result<Json<super::chain::HouseStats>, ApiError> {
    let house = state.house.as_ref().ok_or(ApiError::HouseNotConfigured)?;
    match house.stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            warn!("Failed to fetch house stats from {}: {}", house.address(), e);
            Err(ApiError::Stats(e))
        }
    }
}

async fn coinflip_play_retired() -> Response {
    (
        StatusCode::GONE,
        Json(json!({
            "error": "deprecated_endpoint",
            "message": "Single player coinflip is now handled entirely on-chain. Use the smart contract flip() function directly.",
            "migration": {
                "old_flow": "Frontend -> Backend API -> Settlement",
                "new_flow": "Frontend -> Smart Contract (single transaction)",
                "benefits": ["Faster gameplay", "True decentralization", "No backend dependency", "Immediate settlement"],
            },
        })),
    )
        .into_response()
}

async fn sign_retired() -> Response {
    (
        StatusCode::GONE,
        Json(json!({ "error": "deprecated_endpoint", "message": SIGNATURES_RETIRED, "migration": USE_FLIP })),
    )
        .into_response()
}

async fn bottleflip_sign_retired() -> Response {
    (
        StatusCode::GONE,
        Json(json!({
            "error": "deprecated_endpoint",
            "message": SIGNATURES_RETIRED,
            "migration": USE_FLIP,
            "game": "bottle-flip",
        })),
    )
        .into_response()
}
