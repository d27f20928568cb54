use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::domain::MonthKey;
use crate::engine::{ModelParams, OverrideMetric};
use crate::error::AppError;
use crate::orchestration::ModelView;

/// Anchor-month stock metrics that are stored as override rows but feed
/// the recurrence seeds instead of a computed column.
const SEED_METRICS: [&str; 3] = ["endUsers", "retention2", "mau"];

#[derive(Debug, Deserialize)]
pub struct SetParamRequest {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SetOverrideRequest {
    pub month: String,
    pub metric: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct DeleteOverrideQuery {
    pub month: Option<String>,
    pub metric: Option<String>,
}

/// Mirror the dashboard's `Number(value)` coercion: numbers pass through,
/// numeric strings parse, everything else (and non-finite input) is 0.
fn coerce_number(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn is_known_metric(metric: &str) -> bool {
    OverrideMetric::parse(metric).is_some() || SEED_METRICS.contains(&metric)
}

fn parse_month(raw: &str) -> Result<MonthKey, AppError> {
    raw.parse::<MonthKey>()
        .map_err(|_| AppError::BadRequest("month must be formatted YYYY-MM".to_string()))
}

pub async fn get_model(State(state): State<AppState>) -> Result<Json<ModelView>, AppError> {
    let view = state.model.load().await?;
    Ok(Json(view))
}

pub async fn set_param(
    State(state): State<AppState>,
    Json(body): Json<SetParamRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !ModelParams::KNOWN_KEYS.contains(&body.key.as_str()) {
        return Err(AppError::BadRequest(format!(
            "unknown model parameter: {}",
            body.key
        )));
    }

    let value = coerce_number(&body.value);
    state.repo.set_datapoint(&body.key, value).await?;
    Ok(Json(json!({"ok": true})))
}

pub async fn set_override(
    State(state): State<AppState>,
    Json(body): Json<SetOverrideRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let month = parse_month(&body.month)?;
    if !is_known_metric(&body.metric) {
        return Err(AppError::BadRequest(format!(
            "unknown override metric: {}",
            body.metric
        )));
    }

    let value = coerce_number(&body.value);
    state.repo.set_override(&month, &body.metric, value).await?;
    Ok(Json(json!({"ok": true})))
}

pub async fn delete_override(
    Query(params): Query<DeleteOverrideQuery>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let month = params
        .month
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("month is required".to_string()))?;
    let metric = params
        .metric
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("metric is required".to_string()))?;

    let month = parse_month(month)?;
    let removed = state.repo.delete_override(&month, metric).await?;
    Ok(Json(json!({"ok": true, "removed": removed})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_number(&json!(42.5)), 42.5);
        assert_eq!(coerce_number(&json!("17")), 17.0);
        assert_eq!(coerce_number(&json!(" 3.5 ")), 3.5);
    }

    #[test]
    fn test_coerce_number_falls_back_to_zero() {
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!([1])), 0.0);
    }

    #[test]
    fn test_known_metrics_cover_overrides_and_seeds() {
        assert!(is_known_metric("bookings"));
        assert!(is_known_metric("marketingSpend"));
        assert!(is_known_metric("endUsers"));
        assert!(is_known_metric("mau"));
        assert!(!is_known_metric("revenue"));
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        assert!(parse_month("2025-07").is_ok());
        assert!(parse_month("July 2025").is_err());
    }
}
