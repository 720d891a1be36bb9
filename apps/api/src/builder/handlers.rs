use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::builder::{tailor, TailorRequest, TailoredResume};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/builder/tailor
///
/// Loads the profile (and the targets, when a target is named) through the
/// tiered loader and returns the résumé trimmed to the matching items.
pub async fn handle_tailor(
    State(state): State<AppState>,
    payload: Result<Json<TailorRequest>, JsonRejection>,
) -> Result<Json<TailoredResume>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let target_id = req
        .target_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let target = match target_id {
        Some(id) => {
            let (_, targets) = state.loader.load_targets().await?;
            let target = targets
                .find(id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Target {id} not found")))?;
            Some(target)
        }
        None => None,
    };

    let (tier, profile) = state.loader.load_profile().await?;
    let resume = tailor(profile, target.as_ref(), &req);

    info!(
        "Tailored resume for '{}' from {tier} profile: {} items selected",
        resume.company,
        resume.selected_ids.len()
    );
    Ok(Json(resume))
}
