use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::ride::RideRequest;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers/update_status", post(update_driver_status))
        .route("/drivers/assigned_rides/:driver_id", get(get_assigned_rides))
}

/// Availability as declared by the driver's own client.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverAvailability {
    Available,
    Unavailable,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub driver_id: String,
    pub status: DriverAvailability,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct AssignedRidesResponse {
    pub assigned_rides: Vec<RideRequest>,
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    if payload.driver_id.trim().is_empty() {
        return Err(AppError::BadRequest("driver_id cannot be empty".to_string()));
    }

    let available = payload.status == DriverAvailability::Available;
    state.pool.set_availability(&payload.driver_id, available);
    state
        .metrics
        .available_drivers
        .set(state.pool.available() as i64);

    info!(
        driver_id = %payload.driver_id,
        available,
        "driver availability updated"
    );

    Ok(Json(UpdateStatusResponse {
        message: "driver status updated",
    }))
}

async fn get_assigned_rides(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> Json<AssignedRidesResponse> {
    Json(AssignedRidesResponse {
        assigned_rides: state.ledger.list(&driver_id),
    })
}
