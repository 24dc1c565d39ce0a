use axum::{extract::State, Json};

use super::AppState;

/// GET /devices — every device id seen so far, in first-seen order.
pub async fn list(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.devices().await)
}
