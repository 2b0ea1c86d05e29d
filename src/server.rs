//! HTTP surface
//!
//! Thin glue over [`SwapService`]: request validation, serialization, and
//! status-code mapping only. No swap logic lives here.

use crate::advisor::SwapDecision;
use crate::service::SwapService;
use crate::Error;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

type AppState = Arc<SwapService>;
type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::UnknownToken(_)
        | Error::UnknownDex(_)
        | Error::InvalidAddress(_)
        | Error::InvalidKey(_)
        | Error::InvalidDecision(_)
        | Error::InsufficientBalance { .. }
        | Error::NoWallet => StatusCode::BAD_REQUEST,
        Error::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "swap-advisor",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn swap_history(
    State(service): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let swaps = service.swap_history(&wallet).await.map_err(api_error)?;
    Ok(Json(json!({ "wallet": wallet, "swaps": swaps })))
}

#[derive(Debug, Deserialize)]
struct SwapPathRequest {
    query: String,
}

async fn get_swap_path(
    State(service): State<AppState>,
    Json(request): Json<SwapPathRequest>,
) -> Json<Value> {
    let advice = service.parse_and_get_best_path(&request.query).await;
    Json(json!({
        "advice": advice.text,
        "swap_details": advice.decision,
    }))
}

#[derive(Debug, Deserialize)]
struct ExecuteSwapRequest {
    #[serde(flatten)]
    decision: SwapDecision,
    destination: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Execution is opt-in: callers must pass `?simulate=false` to spend funds.
#[derive(Debug, Deserialize)]
struct ExecuteSwapParams {
    #[serde(default = "default_true")]
    simulate: bool,
}

async fn execute_swap(
    State(service): State<AppState>,
    Query(params): Query<ExecuteSwapParams>,
    Json(request): Json<ExecuteSwapRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = service
        .build_and_execute(
            &request.decision,
            request.destination.as_deref(),
            params.simulate,
        )
        .await
        .map_err(api_error)?;

    Ok(Json(json!({
        "state": result.state,
        "tx_identifier": result.tx_identifier,
        "error": result.error,
    })))
}

#[derive(Deserialize)]
struct ConnectWalletRequest {
    private_key: SecretString,
}

async fn connect_wallet(
    State(service): State<AppState>,
    Json(request): Json<ConnectWalletRequest>,
) -> Result<Json<Value>, ApiError> {
    let address = service
        .load_wallet(&request.private_key)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({ "address": address })))
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/swap-history/{wallet}", get(swap_history))
        .route("/get-swap-path", post(get_swap_path))
        .route("/execute-swap", post(execute_swap))
        .route("/connect-wallet", post(connect_wallet))
        .with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(service: AppState, port: u16) -> crate::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind {}: {}", addr, e)))?;

    tracing::info!(%addr, "listening");
    axum::serve(listener, router(service))
        .await
        .map_err(|e| Error::Config(format!("server error: {}", e)))
}
