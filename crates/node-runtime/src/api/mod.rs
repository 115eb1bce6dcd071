//! # Registration API
//!
//! HTTP surface of the address callbacks subsystem.
//!
//! | Route | Method | Body | `data` |
//! |-------|--------|------|--------|
//! | `/add-address-callback` | POST | `{address, url}` | `true` |
//! | `/list-address-callbacks` | POST | `{address}` | `[url, ...]` |
//! | `/remove-address-callback` | POST | `{address, url}` | `true` |
//! | `/submit-transaction` | POST | pre-annotated transaction | `{tx_id}` (202) |
//! | `/delivery-log` | GET | `?dead_letters=true` | `[record, ...]` |
//! | `/watched-addresses` | GET | | `[address, ...]` |
//! | `/health` | GET | | |
//!
//! Every response except `/health` uses the envelope
//! `{"status":"success","data":...}` or
//! `{"status":"fail","code":"<KIND>","msg":"..."}`.

mod response;

pub use response::{success, ApiError};

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use qc_18_address_callbacks::{
    CallbackRegistryApi, CallbackStore, DeliveryLog, ListenerError, PreAnnotatedTransaction,
    TxListenerHandle,
};

use crate::container::SubsystemContainer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CallbackStore>,
    pub listener: TxListenerHandle<PreAnnotatedTransaction>,
    pub delivery_log: Arc<DeliveryLog>,
}

impl AppState {
    pub fn from_container(container: &SubsystemContainer) -> Self {
        Self {
            registry: container.registry(),
            listener: container.listener(),
            delivery_log: container.delivery_log(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddressCallbackRequest {
    pub address: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCallbacksRequest {
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryLogQuery {
    #[serde(default)]
    pub dead_letters: bool,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/add-address-callback", post(add_address_callback))
        .route("/list-address-callbacks", post(list_address_callbacks))
        .route("/remove-address-callback", post(remove_address_callback))
        .route("/submit-transaction", post(submit_transaction))
        .route("/delivery-log", get(delivery_log))
        .route("/watched-addresses", get(watched_addresses))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` changes.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Starting registration API server");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
}

async fn add_address_callback(
    State(state): State<AppState>,
    payload: Result<Json<AddressCallbackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let inserted = state.registry.add(&req.address, &req.url)?;
    info!(address = %req.address, url = %req.url, "[qc-18] Callback added");
    Ok(success(inserted))
}

async fn list_address_callbacks(
    State(state): State<AppState>,
    payload: Result<Json<ListCallbacksRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let urls = state.registry.list(&req.address)?;
    Ok(success(urls))
}

async fn remove_address_callback(
    State(state): State<AppState>,
    payload: Result<Json<AddressCallbackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    state.registry.delete(&req.address, &req.url)?;
    info!(address = %req.address, url = %req.url, "[qc-18] Callback removed");
    Ok(success(true))
}

async fn submit_transaction(
    State(state): State<AppState>,
    payload: Result<Json<PreAnnotatedTransaction>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(tx) = payload?;
    let tx_id = tx.tx_id.clone();
    state.listener.submit(tx).await.map_err(|e| match e {
        ListenerError::ListenerClosed => {
            ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "LISTENER_CLOSED", e)
        }
        ListenerError::QueueFull => {
            ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "QUEUE_FULL", e)
        }
    })?;
    debug!(tx_id = %tx_id, "[qc-18] Transaction queued");
    Ok((
        StatusCode::ACCEPTED,
        success(serde_json::json!({ "tx_id": tx_id })),
    ))
}

async fn delivery_log(
    State(state): State<AppState>,
    Query(query): Query<DeliveryLogQuery>,
) -> impl IntoResponse {
    let records = if query.dead_letters {
        state.delivery_log.dead_letters()
    } else {
        state.delivery_log.recent()
    };
    success(records)
}

async fn watched_addresses(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.registry.watched_addresses()?))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.listener.is_closed() {
        "degraded"
    } else {
        "healthy"
    };
    Json(serde_json::json!({
        "status": status,
        "service": "address-callbacks",
        "version": env!("CARGO_PKG_VERSION"),
        "pending_transactions": state.listener.pending(),
    }))
}
