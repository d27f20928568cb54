use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::db::repo::{AggregateRow, GroupBy};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesQuery {
    pub group_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesResponse {
    pub group_by: String,
    pub rows: Vec<AggregateDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateDto {
    pub key: String,
    pub actions: i64,
    pub paid_count: i64,
    pub processing_count: i64,
    pub cancelled_count: i64,
    pub paid_profit_rub: String,
    pub pending_profit_rub: String,
    pub total_profit_rub: String,
    pub avg_profit_per_booking_rub: String,
}

impl From<AggregateRow> for AggregateDto {
    fn from(row: AggregateRow) -> Self {
        Self {
            key: row.key,
            actions: row.actions,
            paid_count: row.paid_count,
            processing_count: row.processing_count,
            cancelled_count: row.cancelled_count,
            paid_profit_rub: row.paid_profit_rub.to_canonical_string(),
            pending_profit_rub: row.pending_profit_rub.to_canonical_string(),
            total_profit_rub: row.total_profit_rub.to_canonical_string(),
            avg_profit_per_booking_rub: row.avg_profit_per_booking_rub.to_canonical_string(),
        }
    }
}

fn parse_group_by(raw: Option<&str>) -> Result<GroupBy, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("date") => Ok(GroupBy::Date),
        Some("month") => Ok(GroupBy::Month),
        Some("program") => Ok(GroupBy::Program),
        Some(_) => Err(AppError::BadRequest(
            "groupBy must be one of: date, month, program".to_string(),
        )),
    }
}

fn group_by_label(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Date => "date",
        GroupBy::Month => "month",
        GroupBy::Program => "program",
    }
}

pub async fn get_aggregates(
    Query(params): Query<AggregatesQuery>,
    State(state): State<AppState>,
) -> Result<Json<AggregatesResponse>, AppError> {
    let group_by = parse_group_by(params.group_by.as_deref())?;

    let rows = state.repo.aggregate_actions(group_by).await?;

    Ok(Json(AggregatesResponse {
        group_by: group_by_label(group_by).to_string(),
        rows: rows.into_iter().map(AggregateDto::from).collect(),
    }))
}
