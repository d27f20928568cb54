//! Travelpayouts partner API client.

use super::{PartnerApi, PartnerApiError};
use crate::domain::{
    ActionDetails, ActionState, CampaignId, CurrencyAmounts, FinanceAction, Money, Payment,
    StatsAction,
};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Partner API client for the Travelpayouts finance and statistics endpoints.
#[derive(Clone)]
pub struct TravelpayoutsApi {
    client: Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for TravelpayoutsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TravelpayoutsApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TravelpayoutsApi {
    /// Create a new client against the given base URL.
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    /// Create with the default Travelpayouts API URL.
    pub fn default_url(token: String) -> Self {
        Self::new("https://api.travelpayouts.com".to_string(), token)
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, PartnerApiError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .header(ACCESS_TOKEN_HEADER, &self.token)
                .query(query)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(PartnerApiError::NetworkError(e.to_string()))
                })?;

            classify_response(response).await
        })
        .await
    }

    async fn post_json(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, PartnerApiError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .header(ACCESS_TOKEN_HEADER, &self.token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(PartnerApiError::NetworkError(e.to_string()))
                })?;

            classify_response(response).await
        })
        .await
    }
}

async fn classify_response(
    response: reqwest::Response,
) -> Result<serde_json::Value, backoff::Error<PartnerApiError>> {
    let status = response.status();
    if status == 429 {
        return Err(backoff::Error::transient(PartnerApiError::RateLimited));
    }
    if status.is_server_error() {
        return Err(backoff::Error::transient(PartnerApiError::HttpError {
            status: status.as_u16(),
            message: "Server error".to_string(),
        }));
    }
    if !status.is_success() {
        return Err(backoff::Error::permanent(PartnerApiError::HttpError {
            status: status.as_u16(),
            message: "Client error".to_string(),
        }));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| backoff::Error::permanent(PartnerApiError::ParseError(e.to_string())))
}

#[async_trait]
impl PartnerApi for TravelpayoutsApi {
    async fn fetch_balance(&self) -> Result<CurrencyAmounts, PartnerApiError> {
        debug!("Fetching account balance");
        let response = self.get_json("/finance/v2/get_user_balance", &[]).await?;
        Ok(parse_amounts(response.get("balance")))
    }

    async fn fetch_next_payout(&self) -> Result<CurrencyAmounts, PartnerApiError> {
        debug!("Fetching next payout");
        let response = self
            .get_json("/finance/v2/get_user_next_payout", &[])
            .await?;
        Ok(parse_amounts(response.get("next_payout")))
    }

    async fn fetch_finance_actions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FinanceAction>, PartnerApiError> {
        debug!("Fetching finance actions, limit={}, offset={}", limit, offset);

        let query = [
            ("currency", "rub".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let response = self
            .get_json("/finance/v2/get_user_actions_affecting_balance", &query)
            .await?;

        let rows = response
            .get("actions")
            .and_then(|v| v.as_array())
            .ok_or_else(|| PartnerApiError::ParseError("Expected actions array".to_string()))?;

        let mut actions = Vec::new();
        for row in rows {
            match parse_finance_action(row) {
                Ok(action) => actions.push(action),
                Err(e) => {
                    warn!("Failed to parse finance action: {}", e);
                }
            }
        }

        Ok(actions)
    }

    async fn fetch_stats_actions(
        &self,
        limit: u32,
        offset: u32,
        from_date: &str,
    ) -> Result<Vec<StatsAction>, PartnerApiError> {
        debug!(
            "Fetching stats actions, limit={}, offset={}, from={}",
            limit, offset, from_date
        );

        let payload = serde_json::json!({
            "fields": [
                "action_id",
                "campaign_id",
                "state",
                "price_rub",
                "paid_profit_rub",
                "processing_profit_rub",
                "created_at",
                "updated_at"
            ],
            "filters": [
                {"field": "type", "op": "eq", "value": "action"},
                {"field": "date", "op": "ge", "value": from_date}
            ],
            "sort": [{"field": "created_at", "order": "desc"}],
            "offset": offset,
            "limit": limit
        });
        let response = self.post_json("/statistics/v1/execute_query", payload).await?;

        let rows = response
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| PartnerApiError::ParseError("Expected results array".to_string()))?;

        let mut actions = Vec::new();
        for row in rows {
            match parse_stats_action(row) {
                Ok(action) => actions.push(action),
                Err(e) => {
                    warn!("Failed to parse stats action: {}", e);
                }
            }
        }

        Ok(actions)
    }

    async fn fetch_action_details(&self, raw_id: &str) -> Result<ActionDetails, PartnerApiError> {
        debug!("Fetching action details for id={}", raw_id);

        let query = [
            ("action_id", raw_id.to_string()),
            ("currency", "rub".to_string()),
        ];
        let response = self
            .get_json("/finance/v2/get_action_details", &query)
            .await?;

        Ok(ActionDetails {
            description: response
                .get("description")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }

    async fn fetch_payments(&self, limit: u32) -> Result<Vec<Payment>, PartnerApiError> {
        debug!("Fetching payments, limit={}", limit);

        let query = [
            ("currency", "rub".to_string()),
            ("limit", limit.to_string()),
        ];
        let response = self.get_json("/finance/v2/get_user_payments", &query).await?;

        // The endpoint returns a bare array; tolerate a wrapped one too.
        let rows = response
            .as_array()
            .or_else(|| response.get("payments").and_then(|v| v.as_array()))
            .ok_or_else(|| PartnerApiError::ParseError("Expected payments array".to_string()))?;

        let mut payments = Vec::new();
        for row in rows {
            match parse_payment(row) {
                Ok(payment) => payments.push(payment),
                Err(e) => {
                    warn!("Failed to parse payment: {}", e);
                }
            }
        }

        Ok(payments)
    }
}

fn parse_amounts(value: Option<&serde_json::Value>) -> CurrencyAmounts {
    let empty = serde_json::Value::Null;
    let obj = value.unwrap_or(&empty);
    CurrencyAmounts {
        usd: amount_field(obj, "usd"),
        eur: amount_field(obj, "eur"),
        rub: amount_field(obj, "rub"),
    }
}

fn amount_field(obj: &serde_json::Value, key: &str) -> Money {
    obj.get(key)
        .and_then(money_value)
        .unwrap_or_else(Money::zero)
}

/// Accept a monetary value serialized as either a JSON string or number.
fn money_value(value: &serde_json::Value) -> Option<Money> {
    match value {
        serde_json::Value::String(s) => Money::from_str_canonical(s).ok(),
        serde_json::Value::Number(n) => Money::from_str_canonical(&n.to_string()).ok(),
        _ => None,
    }
}

/// Accept an identifier serialized as either a JSON string or number.
fn id_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn campaign_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_field(row: &serde_json::Value, key: &str) -> Option<String> {
    row.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn parse_finance_action(row: &serde_json::Value) -> Result<FinanceAction, PartnerApiError> {
    let raw_id = row
        .get("action_id")
        .and_then(id_value)
        .ok_or_else(|| PartnerApiError::ParseError("Missing action_id field".to_string()))?;

    let campaign_id = row
        .get("campaign_id")
        .and_then(campaign_value)
        .ok_or_else(|| PartnerApiError::ParseError("Missing campaign_id field".to_string()))?;

    let state = row
        .get("action_state")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    Ok(FinanceAction {
        raw_id,
        campaign_id: CampaignId::new(campaign_id),
        state: ActionState::new(state.to_string()),
        price: row.get("price").and_then(money_value),
        profit: row.get("profit").and_then(money_value),
        description: string_field(row, "description"),
        currency: string_field(row, "currency"),
        booked_at: string_field(row, "booked_at"),
        updated_at: string_field(row, "updated_at"),
    })
}

fn parse_stats_action(row: &serde_json::Value) -> Result<StatsAction, PartnerApiError> {
    let raw_id = row
        .get("action_id")
        .and_then(id_value)
        .ok_or_else(|| PartnerApiError::ParseError("Missing action_id field".to_string()))?;

    let campaign_id = row
        .get("campaign_id")
        .and_then(campaign_value)
        .ok_or_else(|| PartnerApiError::ParseError("Missing campaign_id field".to_string()))?;

    let state = row
        .get("state")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    Ok(StatsAction {
        raw_id,
        campaign_id: CampaignId::new(campaign_id),
        state: ActionState::new(state.to_string()),
        price_rub: row.get("price_rub").and_then(money_value),
        paid_profit_rub: row.get("paid_profit_rub").and_then(money_value),
        processing_profit_rub: row.get("processing_profit_rub").and_then(money_value),
        created_at: string_field(row, "created_at"),
        updated_at: string_field(row, "updated_at"),
    })
}

fn parse_payment(row: &serde_json::Value) -> Result<Payment, PartnerApiError> {
    let payment_uuid = row
        .get("payment_uuid")
        .and_then(id_value)
        .ok_or_else(|| PartnerApiError::ParseError("Missing payment_uuid field".to_string()))?;

    Ok(Payment {
        payment_uuid,
        paid_at: string_field(row, "paid_at").unwrap_or_default(),
        amount: row
            .get("amount")
            .and_then(money_value)
            .unwrap_or_else(Money::zero),
        currency: string_field(row, "currency").unwrap_or_else(|| "rub".to_string()),
        payment_info_id: row.get("payment_info_id").and_then(|v| v.as_i64()),
        comment: string_field(row, "comment"),
    })
}
