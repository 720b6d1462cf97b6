use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::engine::gateway::GatewayError;
use crate::models::ride::{RideRequest, RideStatus};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no available drivers")]
    PoolExhausted,

    #[error("confirmation failed for driver {driver_id}: {source}")]
    Confirmation {
        driver_id: String,
        #[source]
        source: GatewayError,
    },
}

/// Consumes the ride channel until shutdown is signalled or the channel
/// closes. One ride is processed start-to-finish before the next is read;
/// a failed ride never stops the loop.
pub async fn run_dispatch_engine(
    state: Arc<AppState>,
    mut ride_rx: mpsc::Receiver<RideRequest>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("dispatch engine started");
    recover_inflight(&state);

    loop {
        let ride = tokio::select! {
            _ = shutdown.changed() => {
                info!("dispatch engine stopped: shutdown signal");
                break;
            }
            maybe_ride = ride_rx.recv() => match maybe_ride {
                Some(ride) => ride,
                None => {
                    warn!("dispatch engine stopped: ride channel closed");
                    break;
                }
            },
        };

        state.metrics.rides_in_queue.dec();
        let request_id = ride.request_id.clone();
        let start = Instant::now();

        let outcome = match process_ride(&state, ride).await {
            Ok(driver_id) => {
                info!(request_id = %request_id, driver_id = %driver_id, "ride assigned");
                "confirmed"
            }
            Err(DispatchError::PoolExhausted) => {
                warn!(request_id = %request_id, "no available drivers; ride left unassigned");
                "unassignable"
            }
            Err(err @ DispatchError::Confirmation { .. }) => {
                warn!(request_id = %request_id, error = %err, "assignment rolled back");
                "compensated"
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        state
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed);
        state
            .metrics
            .dispatches_total
            .with_label_values(&[outcome])
            .inc();
        state
            .metrics
            .available_drivers
            .set(state.pool.available() as i64);
    }
}

/// Claim, ledger, confirm — and compensate when confirmation fails.
///
/// The claimed driver is held out of the pool for the duration of the
/// confirmation round trip; that window is tracked in `state.inflight` so an
/// interrupted run can be compensated on restart.
pub async fn process_ride(state: &AppState, ride: RideRequest) -> Result<String, DispatchError> {
    let driver_id = state.pool.claim().ok_or(DispatchError::PoolExhausted)?;

    let snapshot = ride.assigned_to(&driver_id, Utc::now());
    state.inflight.insert(driver_id.clone(), snapshot.clone());
    state.ledger.append(&driver_id, snapshot.clone());

    let result = state
        .gateway
        .confirm(&snapshot.request_id, RideStatus::Accepted)
        .await;

    match result {
        Ok(()) => {
            state.inflight.remove(&driver_id);
            Ok(driver_id)
        }
        Err(source) => {
            compensate(state, &driver_id, &snapshot);
            state.inflight.remove(&driver_id);
            Err(DispatchError::Confirmation { driver_id, source })
        }
    }
}

/// Undoes a claimed-and-ledgered assignment. The driver goes back first so it
/// is claimable again as soon as possible; both steps are idempotent, so
/// recovery may safely run this more than once for the same assignment.
fn compensate(state: &AppState, driver_id: &str, snapshot: &RideRequest) {
    state.pool.release(driver_id);
    state.ledger.remove(driver_id, snapshot);
}

/// Compensates assignments left unresolved by a previous run. Called once at
/// engine start, before any ride is consumed.
pub fn recover_inflight(state: &AppState) {
    let leftover: Vec<String> = state
        .inflight
        .iter()
        .map(|entry| entry.key().clone())
        .collect();

    for driver_id in leftover {
        if let Some((_, snapshot)) = state.inflight.remove(&driver_id) {
            warn!(
                driver_id = %driver_id,
                request_id = %snapshot.request_id,
                "compensating unresolved assignment from previous run"
            );
            compensate(state, &driver_id, &snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::{mpsc, watch};

    use super::{process_ride, recover_inflight, run_dispatch_engine, DispatchError};
    use crate::engine::gateway::{ConfirmationGateway, GatewayError};
    use crate::engine::ledger::{AssignmentLedger, InMemoryAssignmentLedger};
    use crate::engine::pool::{DriverPool, InMemoryDriverPool};
    use crate::models::ride::{RideRequest, RideStatus};
    use crate::state::AppState;

    /// Gateway that pops a scripted result per call; defaults to success
    /// once the script runs out.
    struct ScriptedGateway {
        script: Mutex<VecDeque<Result<(), GatewayError>>>,
        calls: Mutex<Vec<(String, RideStatus)>>,
    }

    impl ScriptedGateway {
        fn succeeding() -> Arc<Self> {
            Self::with_script(VecDeque::new())
        }

        fn failing_once() -> Arc<Self> {
            Self::with_script(VecDeque::from([Err(GatewayError::Timeout(
                Duration::from_secs(5),
            ))]))
        }

        fn with_script(script: VecDeque<Result<(), GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, RideStatus)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConfirmationGateway for ScriptedGateway {
        async fn confirm(&self, request_id: &str, status: RideStatus) -> Result<(), GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((request_id.to_string(), status));
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn pending_ride(request_id: &str) -> RideRequest {
        RideRequest {
            request_id: request_id.to_string(),
            user_id: "u-1".to_string(),
            username: "alice".to_string(),
            pickup_location: "12 North Ave".to_string(),
            dropoff_location: "99 South St".to_string(),
            status: RideStatus::Pending,
            created_at: Utc::now(),
            driver_id: None,
            assigned_at: None,
        }
    }

    fn state_with(
        drivers: &[&str],
        gateway: Arc<ScriptedGateway>,
    ) -> (Arc<AppState>, mpsc::Receiver<RideRequest>) {
        let pool = Arc::new(InMemoryDriverPool::new());
        for driver_id in drivers {
            pool.set_availability(driver_id, true);
        }

        let (state, ride_rx) = AppState::new(
            pool,
            Arc::new(InMemoryAssignmentLedger::new()),
            gateway,
            16,
        );
        (Arc::new(state), ride_rx)
    }

    #[tokio::test]
    async fn confirmed_ride_holds_driver_and_ledgers_snapshot() {
        let gateway = ScriptedGateway::succeeding();
        let (state, _ride_rx) = state_with(&["D1"], gateway.clone());

        let driver_id = process_ride(&state, pending_ride("r-1")).await.unwrap();

        assert_eq!(driver_id, "D1");
        assert_eq!(state.pool.available(), 0);

        let rides = state.ledger.list("D1");
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].status, RideStatus::Accepted);
        assert_eq!(rides[0].driver_id.as_deref(), Some("D1"));
        assert!(rides[0].assigned_at.is_some());

        assert_eq!(
            gateway.calls(),
            vec![("r-1".to_string(), RideStatus::Accepted)]
        );
        assert!(state.inflight.is_empty());
    }

    #[tokio::test]
    async fn failed_confirmation_restores_pool_and_ledger() {
        let gateway = ScriptedGateway::failing_once();
        let (state, _ride_rx) = state_with(&["D1"], gateway);

        let err = process_ride(&state, pending_ride("r-1")).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Confirmation { ref driver_id, .. } if driver_id == "D1"
        ));
        assert!(state.pool.is_available("D1"));
        assert!(state.ledger.list("D1").is_empty());
        assert!(state.inflight.is_empty());
    }

    #[tokio::test]
    async fn empty_pool_leaves_ride_unassigned() {
        let gateway = ScriptedGateway::succeeding();
        let (state, _ride_rx) = state_with(&[], gateway.clone());

        let err = process_ride(&state, pending_ride("r-2")).await.unwrap_err();

        assert!(matches!(err, DispatchError::PoolExhausted));
        assert!(state.ledger.list("D1").is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn second_ride_observes_pool_exhausted_while_driver_is_held() {
        let gateway = ScriptedGateway::succeeding();
        let (state, _ride_rx) = state_with(&["D1"], gateway);

        process_ride(&state, pending_ride("r-1")).await.unwrap();
        let err = process_ride(&state, pending_ride("r-2")).await.unwrap_err();

        assert!(matches!(err, DispatchError::PoolExhausted));
        assert_eq!(state.ledger.list("D1").len(), 1);
    }

    #[tokio::test]
    async fn recover_compensates_unresolved_assignments() {
        let gateway = ScriptedGateway::succeeding();
        let (state, _ride_rx) = state_with(&[], gateway);

        // simulate a run that died between ledger write and confirmation
        let snapshot = pending_ride("r-1").assigned_to("D1", Utc::now());
        state.ledger.append("D1", snapshot.clone());
        state.inflight.insert("D1".to_string(), snapshot);

        recover_inflight(&state);

        assert!(state.pool.is_available("D1"));
        assert!(state.ledger.list("D1").is_empty());
        assert!(state.inflight.is_empty());
    }

    #[tokio::test]
    async fn engine_keeps_consuming_after_a_failed_ride() {
        let gateway = ScriptedGateway::failing_once();
        let (state, ride_rx) = state_with(&["D1"], gateway);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine = tokio::spawn(run_dispatch_engine(state.clone(), ride_rx, shutdown_rx));

        state.ride_tx.send(pending_ride("r-1")).await.unwrap();
        state.ride_tx.send(pending_ride("r-2")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown_tx.send(true).unwrap();
        engine.await.unwrap();

        // r-1 was compensated, so D1 was free again for r-2
        let rides = state.ledger.list("D1");
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].request_id, "r-2");
        assert_eq!(state.pool.available(), 0);
    }
}
