use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// GET /health, GET /api/health
/// Lets the front end check that the API is up.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
