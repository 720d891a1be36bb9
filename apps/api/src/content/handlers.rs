use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::loader::{ResourceKind, Tier};
use crate::models::Post;
use crate::state::AppState;

/// GET /api/profile
pub async fn handle_profile(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.content.read(ResourceKind::Profile).await?))
}

/// GET /api/targets
pub async fn handle_targets(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.content.read(ResourceKind::Targets).await?))
}

/// GET /api/posts
pub async fn handle_posts(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.content.read(ResourceKind::Posts).await?))
}

/// GET /data/:file
///
/// The static snapshot path (`/data/<kind>.json`). Serves the same content as
/// `/api/<kind>`, so the static tier has a source even when the site origin
/// is this process.
pub async fn handle_snapshot(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Json<Value>, AppError> {
    let kind = file
        .strip_suffix(".json")
        .and_then(|name| name.parse::<ResourceKind>().ok())
        .ok_or_else(|| AppError::NotFound(format!("Snapshot {file} not found")))?;
    Ok(Json(state.content.read(kind).await?))
}

#[derive(Serialize)]
pub struct BlogResponse {
    pub source: Tier,
    pub posts: Vec<Post>,
}

/// GET /api/blog
///
/// The blog list resolved through the tiered loader, tagged with the tier
/// that answered.
pub async fn handle_blog(State(state): State<AppState>) -> Result<Json<BlogResponse>, AppError> {
    let (source, list) = state.loader.load_posts().await?;
    Ok(Json(BlogResponse {
        source,
        posts: list.posts,
    }))
}
