//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use document_store::DocumentStore;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Notification handlers queued or running.
    pub pending_handlers: usize,
    pub active_sagas: usize,
}

/// GET /health: returns system health status.
pub async fn check<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        pending_handlers: state.system.dispatcher().pending(),
        active_sagas: state.system.saga().active_count().await,
    })
}
