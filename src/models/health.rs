use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub markets: u64,
    pub stream_subscribers: usize,
    pub time: DateTime<Utc>,
}
