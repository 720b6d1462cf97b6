use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a ride record in the system of record. `PENDING` rides are
/// what the stream delivers; this service only ever moves them to `ACCEPTED`.
/// The terminal states are set by the request service, not by us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

/// A ride request as published on the ride stream. `driver_id` and
/// `assigned_at` are absent until this service stamps them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RideRequest {
    pub request_id: String,
    pub user_id: String,
    pub username: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
}

impl RideRequest {
    /// The `ACCEPTED` snapshot written to the ledger: driver id and
    /// assignment time are only ever set together with the status change.
    pub fn assigned_to(&self, driver_id: &str, at: DateTime<Utc>) -> RideRequest {
        let mut snapshot = self.clone();
        snapshot.status = RideStatus::Accepted;
        snapshot.driver_id = Some(driver_id.to_string());
        snapshot.assigned_at = Some(at);
        snapshot
    }
}
