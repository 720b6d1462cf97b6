use dashmap::DashMap;

use crate::models::ride::RideRequest;

/// Per-driver log of assignment events. Entries are appended when a ride is
/// assigned and removed only by compensation; completion and cancellation
/// flows consume them elsewhere.
pub trait AssignmentLedger: Send + Sync + 'static {
    /// Appends a snapshot to the tail of the driver's sequence.
    fn append(&self, driver_id: &str, snapshot: RideRequest);

    /// Removes the first exact-match occurrence of the snapshot. Absent
    /// snapshot is a no-op, so retried compensation stays safe.
    fn remove(&self, driver_id: &str, snapshot: &RideRequest);

    /// The driver's assigned rides in insertion order.
    fn list(&self, driver_id: &str) -> Vec<RideRequest>;
}

#[derive(Default)]
pub struct InMemoryAssignmentLedger {
    entries: DashMap<String, Vec<RideRequest>>,
}

impl InMemoryAssignmentLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssignmentLedger for InMemoryAssignmentLedger {
    fn append(&self, driver_id: &str, snapshot: RideRequest) {
        // the entry guard holds the shard lock, so the push is atomic per key
        self.entries
            .entry(driver_id.to_string())
            .or_default()
            .push(snapshot);
    }

    fn remove(&self, driver_id: &str, snapshot: &RideRequest) {
        if let Some(mut rides) = self.entries.get_mut(driver_id) {
            if let Some(position) = rides.iter().position(|ride| ride == snapshot) {
                rides.remove(position);
            }
        }
    }

    fn list(&self, driver_id: &str) -> Vec<RideRequest> {
        self.entries
            .get(driver_id)
            .map(|rides| rides.clone())
            .unwrap_or_default()
    }
}
