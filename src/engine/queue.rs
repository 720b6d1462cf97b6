use crate::error::AppError;
use crate::models::ride::RideRequest;
use crate::state::AppState;

pub async fn enqueue_ride(state: &AppState, ride: RideRequest) -> Result<(), AppError> {
    state
        .ride_tx
        .send(ride)
        .await
        .map_err(|err| AppError::Internal(format!("ride queue send failed: {err}")))?;

    state.metrics.rides_in_queue.inc();
    Ok(())
}
