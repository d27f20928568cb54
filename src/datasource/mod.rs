//! Partner API abstraction for the affiliate feeds (finance actions,
//! statistics raw actions, balances, payouts, payments, per-action detail).

use crate::domain::{ActionDetails, CurrencyAmounts, FinanceAction, Payment, StatsAction};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod travelpayouts;

pub use mock::MockPartnerApi;
pub use travelpayouts::TravelpayoutsApi;

/// Partner API trait covering the feeds a sync pass consumes.
///
/// Implementations handle authentication, retry/backoff, and rate limiting;
/// pagination is driven by the caller via `limit`/`offset`.
#[async_trait]
pub trait PartnerApi: Send + Sync + fmt::Debug {
    /// Fetch the current account balance.
    async fn fetch_balance(&self) -> Result<CurrencyAmounts, PartnerApiError>;

    /// Fetch the upcoming payout amounts.
    async fn fetch_next_payout(&self) -> Result<CurrencyAmounts, PartnerApiError>;

    /// Fetch one page of finance actions (actions affecting balance).
    async fn fetch_finance_actions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FinanceAction>, PartnerApiError>;

    /// Fetch one page of statistics raw actions created on or after
    /// `from_date` (a `YYYY-MM-DD` string).
    async fn fetch_stats_actions(
        &self,
        limit: u32,
        offset: u32,
        from_date: &str,
    ) -> Result<Vec<StatsAction>, PartnerApiError>;

    /// Fetch detail for one action by its feed-local id.
    async fn fetch_action_details(&self, raw_id: &str) -> Result<ActionDetails, PartnerApiError>;

    /// Fetch the payout history (RUB).
    async fn fetch_payments(&self, limit: u32) -> Result<Vec<Payment>, PartnerApiError>;
}

/// Error type for partner API operations.
#[derive(Debug, Clone)]
pub enum PartnerApiError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Other error
    Other(String),
}

impl fmt::Display for PartnerApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartnerApiError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PartnerApiError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PartnerApiError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PartnerApiError::RateLimited => write!(f, "Rate limited"),
            PartnerApiError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PartnerApiError {}
