use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::ride::RideStatus;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("confirmation timed out after {0:?}")]
    Timeout(Duration),

    #[error("confirmation transport failed: {0}")]
    Transport(String),

    #[error("confirmation rejected with status {0}")]
    Rejected(u16),
}

/// Remote call that durably transitions a ride's status in the system of
/// record. Any error triggers compensation; callers never retry first.
#[async_trait]
pub trait ConfirmationGateway: Send + Sync + 'static {
    async fn confirm(&self, request_id: &str, status: RideStatus) -> Result<(), GatewayError>;
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    request_id: &'a str,
    status: RideStatus,
}

/// Gateway speaking to the ride-request service over HTTP.
pub struct HttpConfirmationGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpConfirmationGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Transport(format!("failed to build client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl ConfirmationGateway for HttpConfirmationGateway {
    async fn confirm(&self, request_id: &str, status: RideStatus) -> Result<(), GatewayError> {
        let url = format!("{}/rides/update_status", self.base_url);

        let response = self
            .client
            .put(&url)
            .json(&StatusUpdate { request_id, status })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GatewayError::Timeout(self.timeout)
                } else {
                    GatewayError::Transport(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}
