//! Response models for the operator surface.
//!
//! The proxy itself relays whatever the origin produces; only errors raised
//! at the edge and the health endpoint have a JSON shape of their own.

use serde::Serialize;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub counters: MetricsSnapshot,
}
