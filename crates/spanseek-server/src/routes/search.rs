//! Search route.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search))
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    k: Option<usize>,
}

/// GET /api/search?q=...&k=... — hybrid search over the loaded index.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    if params.q.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "query parameter 'q' must not be empty"})),
        );
    }

    let ranked = match state.runner.search(&params.q) {
        Ok(ranked) => ranked,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": err.to_string()})),
            );
        }
    };

    let limit = params.k.unwrap_or(state.config.top_k);
    let results: Vec<serde_json::Value> = ranked
        .iter()
        .take(limit)
        .enumerate()
        .filter_map(|(i, hit)| {
            let meta = state.chunks.get(&hit.chunk_id)?;
            Some(serde_json::json!({
                "rank": i + 1,
                "text": meta.text,
                "score": hit.combined_score,
                "file": meta.location,
                "char_range": meta.char_range,
            }))
        })
        .collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "query": params.q,
            "results": results,
        })),
    )
}
