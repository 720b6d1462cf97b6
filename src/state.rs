use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::engine::gateway::ConfirmationGateway;
use crate::engine::ledger::AssignmentLedger;
use crate::engine::pool::DriverPool;
use crate::models::ride::RideRequest;
use crate::observability::metrics::Metrics;

/// Shared service state. Pool, ledger, and gateway are injected so tests can
/// swap in fakes.
pub struct AppState {
    pub pool: Arc<dyn DriverPool>,
    pub ledger: Arc<dyn AssignmentLedger>,
    pub gateway: Arc<dyn ConfirmationGateway>,
    /// Assignments between ledger write and confirmation outcome, keyed by
    /// driver id. Leftovers found at engine start are compensated.
    pub inflight: DashMap<String, RideRequest>,
    pub ride_tx: mpsc::Sender<RideRequest>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        pool: Arc<dyn DriverPool>,
        ledger: Arc<dyn AssignmentLedger>,
        gateway: Arc<dyn ConfirmationGateway>,
        ride_queue_size: usize,
    ) -> (Self, mpsc::Receiver<RideRequest>) {
        let (ride_tx, ride_rx) = mpsc::channel(ride_queue_size);

        (
            Self {
                pool,
                ledger,
                gateway,
                inflight: DashMap::new(),
                ride_tx,
                metrics: Metrics::new(),
            },
            ride_rx,
        )
    }
}
