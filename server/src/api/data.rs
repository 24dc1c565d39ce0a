use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{AppError, AppState};
use crate::store::Placement;

/// Response body for an accepted sample.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: &'static str,
    pub data: Value,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub hours: Option<u64>,
}

/// POST /data — store one sample.
///
/// Any JSON object is accepted and stored as-is; the body is only rejected
/// when it is missing, unparsable or not an object.
pub async fn ingest(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let payload = parse_sample(&body).map_err(|e| {
        warn!("Rejected ingest: {e}");
        e
    })?;

    Ok(Json(IngestResponse {
        message: "Data received successfully",
        data: accept(&state, payload).await,
    }))
}

/// Decode a request body into a sample object.
pub(crate) fn parse_sample(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice(body)? {
        Value::Object(payload) => Ok(payload),
        _ => Err(AppError::Validation(
            "Invalid JSON: body must be an object".to_string(),
        )),
    }
}

/// Store a sample and publish it to live subscribers when it carries a
/// device id. Returns the sample as stored.
pub(crate) async fn accept(state: &AppState, payload: Map<String, Value>) -> Value {
    let sample = Value::Object(payload.clone());
    let now = chrono::Utc::now().timestamp();

    match state.store.append(payload, now).await {
        Placement::Device(device_id) => {
            debug!(device_id = %device_id, "Sample stored");
            state.hub.publish(sample.clone());
        }
        Placement::Unkeyed => debug!("Sample without device id appended to flat log"),
    }
    sample
}

/// GET /data/:device_id?limit=N&hours=H — most recent samples first.
pub async fn history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<Value>> {
    let limit = params.limit.unwrap_or(state.config.default_history_limit);
    let hours = params.hours.unwrap_or(state.config.default_history_hours);
    let now = chrono::Utc::now().timestamp();

    Json(state.store.history(&device_id, limit, hours, now).await)
}

/// GET /data (also served at `/`): payloads that arrived without a device id.
pub async fn unkeyed(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.store.unkeyed().await)
}
