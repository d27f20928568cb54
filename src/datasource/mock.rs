//! Mock partner API for testing without network calls.

use super::{PartnerApi, PartnerApiError};
use crate::domain::{ActionDetails, CurrencyAmounts, FinanceAction, Money, Payment, StatsAction};
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock partner API that serves predefined feed data.
///
/// Pages are sliced from the seeded vectors by `limit`/`offset`, so
/// pagination loops terminate the same way they do against the live API.
#[derive(Debug, Clone)]
pub struct MockPartnerApi {
    balance: Option<CurrencyAmounts>,
    next_payout: Option<CurrencyAmounts>,
    finance: Vec<FinanceAction>,
    stats: Vec<StatsAction>,
    payments: Vec<Payment>,
    descriptions: HashMap<String, String>,
    balance_error: Option<PartnerApiError>,
    finance_error: Option<PartnerApiError>,
    stats_error: Option<PartnerApiError>,
    details_error: Option<PartnerApiError>,
}

impl MockPartnerApi {
    /// Create a new mock partner API with empty feeds.
    pub fn new() -> Self {
        Self {
            balance: None,
            next_payout: None,
            finance: Vec::new(),
            stats: Vec::new(),
            payments: Vec::new(),
            descriptions: HashMap::new(),
            balance_error: None,
            finance_error: None,
            stats_error: None,
            details_error: None,
        }
    }

    /// Set the balance returned by fetch_balance.
    pub fn with_balance(mut self, balance: CurrencyAmounts) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Set the payout returned by fetch_next_payout.
    pub fn with_next_payout(mut self, next_payout: CurrencyAmounts) -> Self {
        self.next_payout = Some(next_payout);
        self
    }

    /// Add a finance action to the mock feed.
    pub fn with_finance_action(mut self, action: FinanceAction) -> Self {
        self.finance.push(action);
        self
    }

    /// Add multiple finance actions to the mock feed.
    pub fn with_finance_actions(mut self, actions: Vec<FinanceAction>) -> Self {
        self.finance.extend(actions);
        self
    }

    /// Add a statistics raw action to the mock feed.
    pub fn with_stats_action(mut self, action: StatsAction) -> Self {
        self.stats.push(action);
        self
    }

    /// Add multiple statistics raw actions to the mock feed.
    pub fn with_stats_actions(mut self, actions: Vec<StatsAction>) -> Self {
        self.stats.extend(actions);
        self
    }

    /// Add a payment to the mock payout history.
    pub fn with_payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    /// Register a detail-lookup description for a feed-local action id.
    pub fn with_action_description(mut self, raw_id: &str, description: &str) -> Self {
        self.descriptions
            .insert(raw_id.to_string(), description.to_string());
        self
    }

    /// Make balance and next-payout fetches fail with the given error.
    pub fn with_balance_error(mut self, error: PartnerApiError) -> Self {
        self.balance_error = Some(error);
        self
    }

    /// Make finance feed fetches fail with the given error.
    pub fn with_finance_error(mut self, error: PartnerApiError) -> Self {
        self.finance_error = Some(error);
        self
    }

    /// Make statistics feed fetches fail with the given error.
    pub fn with_stats_error(mut self, error: PartnerApiError) -> Self {
        self.stats_error = Some(error);
        self
    }

    /// Make detail lookups fail with the given error.
    pub fn with_details_error(mut self, error: PartnerApiError) -> Self {
        self.details_error = Some(error);
        self
    }

    fn zero_amounts() -> CurrencyAmounts {
        CurrencyAmounts {
            usd: Money::zero(),
            eur: Money::zero(),
            rub: Money::zero(),
        }
    }

    fn page<T: Clone>(items: &[T], limit: u32, offset: u32) -> Vec<T> {
        items
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for MockPartnerApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PartnerApi for MockPartnerApi {
    async fn fetch_balance(&self) -> Result<CurrencyAmounts, PartnerApiError> {
        if let Some(err) = &self.balance_error {
            return Err(err.clone());
        }
        Ok(self.balance.clone().unwrap_or_else(Self::zero_amounts))
    }

    async fn fetch_next_payout(&self) -> Result<CurrencyAmounts, PartnerApiError> {
        if let Some(err) = &self.balance_error {
            return Err(err.clone());
        }
        Ok(self.next_payout.clone().unwrap_or_else(Self::zero_amounts))
    }

    async fn fetch_finance_actions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FinanceAction>, PartnerApiError> {
        if let Some(err) = &self.finance_error {
            return Err(err.clone());
        }
        Ok(Self::page(&self.finance, limit, offset))
    }

    async fn fetch_stats_actions(
        &self,
        limit: u32,
        offset: u32,
        _from_date: &str,
    ) -> Result<Vec<StatsAction>, PartnerApiError> {
        if let Some(err) = &self.stats_error {
            return Err(err.clone());
        }
        Ok(Self::page(&self.stats, limit, offset))
    }

    async fn fetch_action_details(&self, raw_id: &str) -> Result<ActionDetails, PartnerApiError> {
        if let Some(err) = &self.details_error {
            return Err(err.clone());
        }
        Ok(ActionDetails {
            description: self.descriptions.get(raw_id).cloned(),
        })
    }

    async fn fetch_payments(&self, limit: u32) -> Result<Vec<Payment>, PartnerApiError> {
        Ok(Self::page(&self.payments, limit, 0))
    }
}
