//! HTTP and WebSocket handlers for notehub-api.

pub mod notes;
pub mod users;
pub mod ws;

use axum::Json;
use serde::Serialize;

/// Body returned by writes that only report the note's new version.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: u64,
}

pub(crate) fn version(version: u64) -> Json<VersionResponse> {
    Json(VersionResponse { version })
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
