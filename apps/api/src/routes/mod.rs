pub mod health;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::builder::handlers as builder;
use crate::content::handlers as content;
use crate::state::AppState;

/// GET /api/loading
/// Number of tiered loads currently in flight.
async fn loading_handler(State(state): State<AppState>) -> Json<Value> {
    let pending = state.loading.pending();
    Json(json!({
        "pending": pending,
        "loading": pending > 0
    }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::health_handler))
        // Content snapshots
        .route("/api/profile", get(content::handle_profile))
        .route("/api/targets", get(content::handle_targets))
        .route("/api/posts", get(content::handle_posts))
        .route("/api/blog", get(content::handle_blog))
        .route("/data/:file", get(content::handle_snapshot))
        .route("/api/loading", get(loading_handler))
        // Builder
        .route("/api/builder/tailor", post(builder::handle_tailor))
        .with_state(state)
}
