//! Stats route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /api/stats — index statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "dataset": state.dataset_name,
        "fingerprint": state.fingerprint.as_str(),
        "documents": state.document_count(),
        "chunks": state.chunks.len(),
        "splitting_methods": state.config.splitting_method,
        "embedding_model": state.config.embedding_model,
        "top_k": state.config.top_k,
    }))
}
