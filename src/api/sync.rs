use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;
use crate::orchestration::SyncReport;

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    pub reset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: SyncReport,
}

/// Run a full sync pass against the partner API. `?reset=1` wipes the
/// stored actions and daily rollup first.
pub async fn run_sync(
    Query(params): Query<SyncQuery>,
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, AppError> {
    let reset = params.reset.as_deref() == Some("1");
    let report = state.sync.run(reset).await?;
    Ok(Json(SyncResponse { ok: true, report }))
}
