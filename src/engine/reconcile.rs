//! Reconciliation of the finance and statistics feeds into canonical records.
//!
//! The finance feed is authoritative for monetary fields and booking
//! timestamps; the statistics feed is authoritative for state and covers
//! transactions the finance feed has not surfaced yet (processing,
//! cancelled). Records from both feeds meet under the canonical id
//! `"{campaignId}:{rawId}"`.

use crate::datasource::PartnerApi;
use crate::domain::{ActionId, ActionRecord, FinanceAction, StatsAction};
use std::collections::BTreeMap;
use tracing::warn;

/// Merge one finance-feed snapshot and one statistics-feed snapshot into
/// canonical records keyed by canonical id.
///
/// Finance records enter the map verbatim first; each statistics record then
/// merges over the entry with the same canonical id (or creates one). Records
/// with an empty description get a best-effort backfill from the detail
/// endpoint; a failed lookup leaves the description empty and never fails the
/// merge.
pub async fn merge_feeds(
    finance: &[FinanceAction],
    stats: &[StatsAction],
    api: &dyn PartnerApi,
) -> BTreeMap<ActionId, ActionRecord> {
    let mut merged: BTreeMap<ActionId, ActionRecord> = BTreeMap::new();

    for fin in finance {
        let record = ActionRecord::from(fin.clone());
        merged.insert(record.id.clone(), record);
    }

    for stat in stats {
        let id = stat.canonical_id();
        let existing = merged.get(&id).cloned();
        let description = resolve_description(existing.as_ref(), stat, api).await;
        let record = merge_stats(existing.as_ref(), stat, id.clone(), description);
        merged.insert(id, record);
    }

    merged
}

/// Keep an existing non-empty description; otherwise look the action up by
/// its feed-local id. Lookup failures are logged and yield an empty string.
async fn resolve_description(
    existing: Option<&ActionRecord>,
    stat: &StatsAction,
    api: &dyn PartnerApi,
) -> String {
    if let Some(record) = existing {
        if !record.description.is_empty() {
            return record.description.clone();
        }
    }

    match api.fetch_action_details(&stat.raw_id).await {
        Ok(details) => details.description.unwrap_or_default(),
        Err(e) => {
            warn!("Failed to fetch details for action {}: {}", stat.raw_id, e);
            String::new()
        }
    }
}

/// Merge one statistics record over the existing entry (if any).
///
/// State and campaign come from the statistics record; the currency is pinned
/// to RUB since the statistics feed reports RUB figures. Price and profit
/// prefer the existing finance values, falling back to the statistics ones;
/// the profit fallback uses the paid profit and, for processing records, the
/// processing profit. The paid/processing profit parts always reflect the
/// statistics record.
fn merge_stats(
    existing: Option<&ActionRecord>,
    stat: &StatsAction,
    id: ActionId,
    description: String,
) -> ActionRecord {
    let processing_fallback = if stat.state.is_processing() {
        stat.processing_profit_rub
    } else {
        None
    };

    ActionRecord {
        id,
        campaign_id: stat.campaign_id,
        state: stat.state.clone(),
        currency: Some("rub".to_string()),
        price: existing.and_then(|e| e.price).or(stat.price_rub),
        profit: existing
            .and_then(|e| e.profit)
            .or(stat.paid_profit_rub)
            .or(processing_fallback),
        paid_profit: stat.paid_profit_rub,
        processing_profit: stat.processing_profit_rub,
        description,
        booked_at: existing
            .and_then(|e| e.booked_at.clone())
            .or_else(|| stat.created_at.clone()),
        updated_at_remote: existing
            .and_then(|e| e.updated_at_remote.clone())
            .or_else(|| stat.updated_at.clone()),
    }
}

/// Merge an incoming record over the stored one with the same canonical id.
///
/// Identity fields stay as stored. State and currency always follow the
/// incoming record; the remaining fields keep the stored value when the
/// incoming record has none, and a non-empty stored description is never
/// erased by an empty incoming one.
pub fn merge_stored(existing: &ActionRecord, incoming: &ActionRecord) -> ActionRecord {
    ActionRecord {
        id: existing.id.clone(),
        campaign_id: existing.campaign_id,
        state: incoming.state.clone(),
        currency: incoming.currency.clone(),
        price: incoming.price.or(existing.price),
        profit: incoming.profit.or(existing.profit),
        paid_profit: incoming.paid_profit.or(existing.paid_profit),
        processing_profit: incoming.processing_profit.or(existing.processing_profit),
        description: if incoming.description.is_empty() {
            existing.description.clone()
        } else {
            incoming.description.clone()
        },
        booked_at: incoming
            .booked_at
            .clone()
            .or_else(|| existing.booked_at.clone()),
        updated_at_remote: incoming
            .updated_at_remote
            .clone()
            .or_else(|| existing.updated_at_remote.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockPartnerApi, PartnerApiError};
    use crate::domain::{ActionState, CampaignId, Money};

    fn make_finance(raw_id: &str) -> FinanceAction {
        FinanceAction {
            raw_id: raw_id.to_string(),
            campaign_id: CampaignId::new(100),
            state: ActionState::new("paid".to_string()),
            price: Some(Money::from(15000)),
            profit: Some(Money::from(750)),
            description: Some("Hotel in Prague".to_string()),
            currency: Some("rub".to_string()),
            booked_at: Some("2025-07-01T10:00:00Z".to_string()),
            updated_at: Some("2025-07-02T10:00:00Z".to_string()),
        }
    }

    fn make_stats(raw_id: &str) -> StatsAction {
        StatsAction {
            raw_id: raw_id.to_string(),
            campaign_id: CampaignId::new(100),
            state: ActionState::new("paid".to_string()),
            price_rub: Some(Money::from(14000)),
            paid_profit_rub: Some(Money::from(700)),
            processing_profit_rub: None,
            created_at: Some("2025-07-03T08:00:00Z".to_string()),
            updated_at: Some("2025-07-03T09:00:00Z".to_string()),
        }
    }

    #[tokio::test]
    async fn test_finance_only_passes_through() {
        let api = MockPartnerApi::new();
        let finance = vec![make_finance("778899")];

        let merged = merge_feeds(&finance, &[], &api).await;
        assert_eq!(merged.len(), 1);

        let record = &merged[&ActionId::new("100:778899".to_string())];
        assert_eq!(record.price, Some(Money::from(15000)));
        assert_eq!(record.profit, Some(Money::from(750)));
        assert_eq!(record.description, "Hotel in Prague");
        assert!(record.paid_profit.is_none());
        assert!(record.processing_profit.is_none());
    }

    #[tokio::test]
    async fn test_both_feeds_merge_under_one_key() {
        // Finance carries the bare id, statistics the prefixed one.
        let api = MockPartnerApi::new();
        let finance = vec![make_finance("778899")];
        let stats = vec![make_stats("100:778899")];

        let merged = merge_feeds(&finance, &stats, &api).await;
        assert_eq!(merged.len(), 1);

        let record = &merged[&ActionId::new("100:778899".to_string())];
        // Finance monetary fields and timestamps win, statistics state wins.
        assert_eq!(record.price, Some(Money::from(15000)));
        assert_eq!(record.profit, Some(Money::from(750)));
        assert_eq!(record.booked_at.as_deref(), Some("2025-07-01T10:00:00Z"));
        assert_eq!(
            record.updated_at_remote.as_deref(),
            Some("2025-07-02T10:00:00Z")
        );
        assert_eq!(record.currency.as_deref(), Some("rub"));
        assert_eq!(record.paid_profit, Some(Money::from(700)));
        // Description kept without a detail lookup.
        assert_eq!(record.description, "Hotel in Prague");
    }

    #[tokio::test]
    async fn test_stats_only_record_backfills_description() {
        let api = MockPartnerApi::new().with_action_description("445566", "Flight to Rome");
        let stats = vec![make_stats("445566")];

        let merged = merge_feeds(&[], &stats, &api).await;
        let record = &merged[&ActionId::new("100:445566".to_string())];

        assert_eq!(record.description, "Flight to Rome");
        assert_eq!(record.price, Some(Money::from(14000)));
        assert_eq!(record.profit, Some(Money::from(700)));
        assert_eq!(record.booked_at.as_deref(), Some("2025-07-03T08:00:00Z"));
        assert_eq!(
            record.updated_at_remote.as_deref(),
            Some("2025-07-03T09:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_description_backfill_failure_is_swallowed() {
        let api = MockPartnerApi::new()
            .with_details_error(PartnerApiError::NetworkError("timeout".to_string()));
        let stats = vec![make_stats("445566")];

        let merged = merge_feeds(&[], &stats, &api).await;
        let record = &merged[&ActionId::new("100:445566".to_string())];

        assert_eq!(record.description, "");
        assert_eq!(record.paid_profit, Some(Money::from(700)));
    }

    #[tokio::test]
    async fn test_processing_profit_fallback() {
        let api = MockPartnerApi::new();
        let mut stat = make_stats("9001");
        stat.state = ActionState::new("processing".to_string());
        stat.paid_profit_rub = None;
        stat.processing_profit_rub = Some(Money::from(600));

        let merged = merge_feeds(&[], &[stat], &api).await;
        let record = &merged[&ActionId::new("100:9001".to_string())];
        assert_eq!(record.profit, Some(Money::from(600)));
        assert_eq!(record.processing_profit, Some(Money::from(600)));
    }

    #[tokio::test]
    async fn test_processing_profit_ignored_for_other_states() {
        let api = MockPartnerApi::new();
        let mut stat = make_stats("9002");
        stat.state = ActionState::new("cancelled".to_string());
        stat.paid_profit_rub = None;
        stat.processing_profit_rub = Some(Money::from(600));

        let merged = merge_feeds(&[], &[stat], &api).await;
        let record = &merged[&ActionId::new("100:9002".to_string())];
        assert!(record.profit.is_none());
        assert_eq!(record.processing_profit, Some(Money::from(600)));
    }

    #[tokio::test]
    async fn test_duplicate_stats_rows_refresh_profit_parts() {
        let api = MockPartnerApi::new();
        let first = make_stats("7001");
        let mut second = make_stats("7001");
        second.paid_profit_rub = None;
        second.state = ActionState::new("processing".to_string());

        let merged = merge_feeds(&[], &[first, second], &api).await;
        let record = &merged[&ActionId::new("100:7001".to_string())];

        // The rolled-up profit keeps the first value, the parts reflect the
        // latest statistics row.
        assert_eq!(record.profit, Some(Money::from(700)));
        assert!(record.paid_profit.is_none());
        assert!(record.state.is_processing());
    }

    #[test]
    fn test_merge_stored_incoming_wins_state_and_currency() {
        let existing = ActionRecord::from(make_finance("778899"));
        let mut incoming = existing.clone();
        incoming.state = ActionState::new("cancelled".to_string());
        incoming.currency = None;

        let merged = merge_stored(&existing, &incoming);
        assert!(merged.state.is_cancelled());
        assert!(merged.currency.is_none());
    }

    #[test]
    fn test_merge_stored_keeps_existing_when_incoming_missing() {
        let existing = ActionRecord::from(make_finance("778899"));
        let mut incoming = existing.clone();
        incoming.price = None;
        incoming.profit = None;
        incoming.booked_at = None;
        incoming.description = String::new();

        let merged = merge_stored(&existing, &incoming);
        assert_eq!(merged.price, Some(Money::from(15000)));
        assert_eq!(merged.profit, Some(Money::from(750)));
        assert_eq!(merged.booked_at.as_deref(), Some("2025-07-01T10:00:00Z"));
        assert_eq!(merged.description, "Hotel in Prague");
    }

    #[test]
    fn test_merge_stored_incoming_values_replace() {
        let existing = ActionRecord::from(make_finance("778899"));
        let mut incoming = existing.clone();
        incoming.price = Some(Money::from(16000));
        incoming.description = "Hotel in Vienna".to_string();
        incoming.paid_profit = Some(Money::from(800));

        let merged = merge_stored(&existing, &incoming);
        assert_eq!(merged.price, Some(Money::from(16000)));
        assert_eq!(merged.description, "Hotel in Vienna");
        assert_eq!(merged.paid_profit, Some(Money::from(800)));
        // Identity stays as stored.
        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.campaign_id, existing.campaign_id);
    }
}
