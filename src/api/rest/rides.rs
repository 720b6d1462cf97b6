use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;

use crate::engine::queue::enqueue_ride;
use crate::error::AppError;
use crate::models::ride::RideRequest;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/rides", post(ingest_ride))
}

/// Entry point for the ride stream: the request service publishes ride
/// request messages here and the engine consumes them in order. Redelivered
/// messages are not deduplicated.
async fn ingest_ride(
    State(state): State<Arc<AppState>>,
    Json(ride): Json<RideRequest>,
) -> Result<(StatusCode, Json<RideRequest>), AppError> {
    if ride.request_id.trim().is_empty() {
        return Err(AppError::BadRequest("request_id cannot be empty".to_string()));
    }

    enqueue_ride(&state, ride.clone()).await?;

    Ok((StatusCode::ACCEPTED, Json(ride)))
}
