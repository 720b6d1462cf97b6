use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub ride_queue_size: usize,
    pub ride_request_service_url: String,
    pub confirm_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            ride_queue_size: parse_or_default("RIDE_QUEUE_SIZE", 1024)?,
            ride_request_service_url: env::var("RIDE_REQUEST_SERVICE_URL")
                .unwrap_or_else(|_| "http://ride-request-service:5001".to_string()),
            confirm_timeout_secs: parse_or_default("CONFIRM_TIMEOUT_SECS", 5)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
