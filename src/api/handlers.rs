use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::vehicle::VehicleRecord;
use crate::AppState;

// ── Sync triggers ────────────────────────────────────────────

/// GET|POST /api/meli/refresh: make sure a valid marketplace token is stored
pub async fn refresh_token(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let token = state.tokens.obtain_valid_token().await?;
    Ok(Json(json!({
        "ok": true,
        "expires_at": token.expires_at,
        "now": Utc::now().timestamp_millis(),
    })))
}

/// GET|POST /api/meli/sync: pull active listings into the vehicle store
pub async fn sync_listings(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let report = state.sync.run_sync().await?;
    tracing::info!(count = report.count, failed = report.failures.len(), "sync trigger finished");
    Ok(Json(json!({
        "ok": true,
        "count": report.count,
        "failures": report.failures,
    })))
}

/// GET|POST /api/vehicles/sync: same run as `/api/meli/sync`, with a message
pub async fn sync_vehicles(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let report = state.sync.run_sync().await?;
    let message = if report.count == 0 && report.failures.is_empty() {
        "no active listings found on the marketplace"
    } else {
        "sync completed"
    };
    Ok(Json(json!({
        "ok": true,
        "count": report.count,
        "failures": report.failures,
        "message": message,
    })))
}

// ── Catalog reads ────────────────────────────────────────────

/// GET /api/vehicles: stored catalog, cheapest first
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VehicleRecord>>, AppError> {
    let vehicles = state.vehicles.list_vehicles().await?;
    Ok(Json(vehicles))
}

/// GET /api/vehicles/:slug
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<VehicleRecord>, AppError> {
    state
        .vehicles
        .get_vehicle_by_slug(&slug.to_lowercase())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("vehicle '{}'", slug)))
}

// ── Probes ───────────────────────────────────────────────────

/// GET /readyz: the store answers queries
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.vehicles.count_vehicles().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
