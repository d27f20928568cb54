//! Transaction records from the two partner feeds and their merged form.

use crate::domain::{ActionId, ActionState, CampaignId, Money};
use serde::{Deserialize, Serialize};

/// A record from the finance actions feed (actions affecting balance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceAction {
    /// Feed-local id, possibly without a campaign prefix.
    pub raw_id: String,
    pub campaign_id: CampaignId,
    pub state: ActionState,
    pub price: Option<Money>,
    pub profit: Option<Money>,
    pub description: Option<String>,
    pub currency: Option<String>,
    pub booked_at: Option<String>,
    pub updated_at: Option<String>,
}

impl FinanceAction {
    /// Canonical id for this record.
    pub fn canonical_id(&self) -> ActionId {
        ActionId::canonical(&self.raw_id, self.campaign_id.as_i64())
    }
}

/// A record from the statistics raw-actions feed.
///
/// Covers states the finance feed omits (processing, cancelled) and carries
/// profit split into paid/processing parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsAction {
    pub raw_id: String,
    pub campaign_id: CampaignId,
    pub state: ActionState,
    pub price_rub: Option<Money>,
    pub paid_profit_rub: Option<Money>,
    pub processing_profit_rub: Option<Money>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl StatsAction {
    /// Canonical id for this record.
    pub fn canonical_id(&self) -> ActionId {
        ActionId::canonical(&self.raw_id, self.campaign_id.as_i64())
    }
}

/// The canonical merged transaction record persisted by the store.
///
/// `price`/`profit` are `None` when neither feed supplied a value; they are
/// stored as `"0"`. `description` may be empty and is then backfilled from a
/// detail lookup when possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub campaign_id: CampaignId,
    pub state: ActionState,
    pub currency: Option<String>,
    pub price: Option<Money>,
    pub profit: Option<Money>,
    pub paid_profit: Option<Money>,
    pub processing_profit: Option<Money>,
    pub description: String,
    pub booked_at: Option<String>,
    pub updated_at_remote: Option<String>,
}

impl From<FinanceAction> for ActionRecord {
    /// A finance record enters the merge map verbatim under its canonical id.
    fn from(fin: FinanceAction) -> Self {
        let id = fin.canonical_id();
        ActionRecord {
            id,
            campaign_id: fin.campaign_id,
            state: fin.state,
            currency: fin.currency,
            price: fin.price,
            profit: fin.profit,
            paid_profit: None,
            processing_profit: None,
            description: fin.description.unwrap_or_default(),
            booked_at: fin.booked_at,
            updated_at_remote: fin.updated_at,
        }
    }
}

/// Per-action detail as returned by the detail endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDetails {
    pub description: Option<String>,
}

/// Balance-style amount triple returned by the finance API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmounts {
    pub usd: Money,
    pub eur: Money,
    pub rub: Money,
}

/// One payout history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_uuid: String,
    pub paid_at: String,
    pub amount: Money,
    pub currency: String,
    pub payment_info_id: Option<i64>,
    pub comment: Option<String>,
}
