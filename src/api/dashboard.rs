use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::db::repo::{DailyStatRow, SnapshotRow};
use crate::domain::{ActionRecord, Money, Payment};
use crate::error::AppError;

const DEFAULT_PAGE_LIMIT: i64 = 100;
const MAX_PAGE_LIMIT: i64 = 500;
const DAILY_ROWS_LIMIT: i64 = 365;
const PAYMENT_ROWS_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub actions: Vec<ActionDto>,
    pub total: i64,
    pub balance: Option<SnapshotDto>,
    pub next_payout: Option<SnapshotDto>,
    pub daily: Vec<DailyDto>,
    pub payments: Vec<PaymentDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    pub action_id: String,
    pub campaign_id: i64,
    pub action_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub price: String,
    pub profit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_profit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_remote: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub captured_at: String,
    pub usd: String,
    pub eur: String,
    pub rub: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDto {
    pub date: String,
    pub clicks: i64,
    pub bookings: i64,
    pub earnings: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub payment_uuid: String,
    pub paid_at: String,
    pub amount: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<ActionRecord> for ActionDto {
    fn from(record: ActionRecord) -> Self {
        // The headline profit prefers the paid amount over the raw feed value.
        let profit = record
            .paid_profit
            .or(record.profit)
            .unwrap_or_else(Money::zero);

        Self {
            action_id: record.id.as_str().to_string(),
            campaign_id: record.campaign_id.as_i64(),
            action_state: record.state.as_str().to_string(),
            currency: record.currency,
            price: record
                .price
                .unwrap_or_else(Money::zero)
                .to_canonical_string(),
            profit: profit.to_canonical_string(),
            processing_profit: record
                .processing_profit
                .map(|m| m.to_canonical_string()),
            description: (!record.description.is_empty()).then_some(record.description),
            booked_at: record.booked_at,
            updated_at_remote: record.updated_at_remote,
        }
    }
}

impl From<SnapshotRow> for SnapshotDto {
    fn from(row: SnapshotRow) -> Self {
        Self {
            captured_at: row.captured_at,
            usd: row.amounts.usd.to_canonical_string(),
            eur: row.amounts.eur.to_canonical_string(),
            rub: row.amounts.rub.to_canonical_string(),
        }
    }
}

impl From<DailyStatRow> for DailyDto {
    fn from(row: DailyStatRow) -> Self {
        Self {
            date: row.date,
            clicks: row.clicks,
            bookings: row.bookings,
            earnings: row.earnings.to_canonical_string(),
        }
    }
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            payment_uuid: p.payment_uuid,
            paid_at: p.paid_at,
            amount: p.amount.to_canonical_string(),
            currency: p.currency,
            payment_info_id: p.payment_info_id,
            comment: p.comment,
        }
    }
}

/// Page size, coerced the way the dashboard UI sends it: anything that
/// fails to parse falls back to the default, everything else is truncated
/// and clamped to 1..=500.
fn parse_limit(raw: Option<&str>) -> i64 {
    let value = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return DEFAULT_PAGE_LIMIT,
        },
        None => return DEFAULT_PAGE_LIMIT,
    };
    (value.trunc() as i64).clamp(1, MAX_PAGE_LIMIT)
}

fn parse_offset(raw: Option<&str>) -> i64 {
    let value = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return 0,
        },
        None => return 0,
    };
    (value.trunc() as i64).max(0)
}

pub async fn get_dashboard(
    Query(params): Query<DashboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let limit = parse_limit(params.limit.as_deref());
    let offset = parse_offset(params.offset.as_deref());

    let actions = state.repo.list_actions(limit, offset).await?;
    let total = state.repo.count_actions().await?;
    let balance = state.repo.latest_balance_snapshot().await?;
    let next_payout = state.repo.latest_next_payout_snapshot().await?;
    let daily = state.repo.list_daily_stats(DAILY_ROWS_LIMIT).await?;
    let payments = state.repo.list_payments(PAYMENT_ROWS_LIMIT).await?;

    Ok(Json(DashboardResponse {
        actions: actions.into_iter().map(ActionDto::from).collect(),
        total,
        balance: balance.map(SnapshotDto::from),
        next_payout: next_payout.map(SnapshotDto::from),
        daily: daily.into_iter().map(DailyDto::from).collect(),
        payments: payments.into_iter().map(PaymentDto::from).collect(),
    }))
}
