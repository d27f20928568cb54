use axum::extract::State;
use axum::Json;
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::error::AppError;

/// Drop every stored action so the next sync rebuilds from the feeds.
pub async fn clear_actions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state.repo.clear_actions().await?;
    info!(removed, "Cleared stored actions");
    Ok(Json(json!({"ok": true, "removed": removed})))
}
