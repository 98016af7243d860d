use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::{AppError, SyncError};
use crate::models::vehicle::VehicleRecord;
use crate::AppState;

/// GET /admin/status: credential expiry and catalog size. Never the secrets.
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let now = Utc::now().timestamp_millis();
    let token = state
        .tokens
        .stored_token()
        .await
        .map_err(SyncError::Store)?;
    let vehicles = state.vehicles.count_vehicles().await?;

    let credential = match token {
        Some(t) => json!({
            "expires_at": t.expires_at,
            "expires_in_secs": (t.expires_at - now) / 1000,
        }),
        None => Value::Null,
    };

    Ok(Json(json!({
        "ok": true,
        "now": now,
        "credential": credential,
        "vehicles": vehicles,
    })))
}

/// GET /admin/vehicles
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VehicleRecord>>, AppError> {
    Ok(Json(state.vehicles.list_vehicles().await?))
}
