//! One full sync pass against the partner API.

use crate::config::Config;
use crate::datasource::{PartnerApi, PartnerApiError};
use crate::db::repo::DailyStatRow;
use crate::db::Repository;
use crate::domain::{ActionRecord, FinanceAction, Money, StatsAction};
use crate::engine::merge_feeds;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const FINANCE_PAGE_SIZE: u32 = 300;
const STATS_PAGE_SIZE: u32 = 500;
const FEED_FETCH_CAP: u32 = 2000;
const PAYMENTS_FETCH_LIMIT: u32 = 200;

/// Runs sync passes: fetches the partner feeds, reconciles them, and lands
/// the result in the store.
#[derive(Clone)]
pub struct SyncRunner {
    api: Arc<dyn PartnerApi>,
    repo: Arc<Repository>,
    config: Config,
}

impl SyncRunner {
    pub fn new(api: Arc<dyn PartnerApi>, repo: Arc<Repository>, config: Config) -> Self {
        Self { api, repo, config }
    }

    /// Run one sync pass.
    ///
    /// Captures balance and next-payout snapshots, pages through both feeds,
    /// merges them, upserts the merged records, rebuilds the per-day rollup
    /// from the finance feed, and upserts the payout history. With `reset`
    /// set, stored actions and daily rollups are dropped first.
    pub async fn run(&self, reset: bool) -> Result<SyncReport, SyncError> {
        if reset {
            info!("Resetting stored actions and daily statistics before sync");
            self.repo.reset_sync_data().await?;
        }

        let (balance, next_payout) = tokio::try_join!(
            self.api.fetch_balance(),
            self.api.fetch_next_payout()
        )?;
        self.repo.insert_balance_snapshot(&balance).await?;
        self.repo.insert_next_payout_snapshot(&next_payout).await?;

        let finance = self
            .fetch_finance_feed(FINANCE_PAGE_SIZE, FEED_FETCH_CAP)
            .await?;

        let from_date = (Utc::now() - Duration::days(self.config.stats_lookback_days))
            .format("%Y-%m-%d")
            .to_string();
        let stats = self
            .fetch_stats_feed(STATS_PAGE_SIZE, FEED_FETCH_CAP, &from_date)
            .await?;

        let payments = self.api.fetch_payments(PAYMENTS_FETCH_LIMIT).await?;

        let merged = merge_feeds(&finance, &stats, self.api.as_ref()).await;
        let records: Vec<ActionRecord> = merged.into_values().collect();
        let upserted = self.repo.upsert_actions_batch(&records).await?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let daily = build_daily_stats(&finance, &today);
        self.repo.upsert_daily_stats(&daily).await?;
        let payments_upserted = self.repo.upsert_payments_batch(&payments).await?;

        let report = SyncReport {
            reset,
            finance_actions: finance.len(),
            stats_actions: stats.len(),
            merged_records: records.len(),
            inserted: upserted.inserted,
            updated: upserted.updated,
            payments: payments_upserted,
            daily_days: daily.len(),
        };
        info!(
            "Sync pass complete: {} merged records ({} new, {} updated), {} daily rows, {} payments",
            report.merged_records, report.inserted, report.updated, report.daily_days, report.payments
        );
        Ok(report)
    }

    /// Page through the finance feed until a short or empty page, capped.
    async fn fetch_finance_feed(
        &self,
        page_size: u32,
        cap: u32,
    ) -> Result<Vec<FinanceAction>, SyncError> {
        let mut all = Vec::new();
        let mut offset = 0u32;

        while offset < cap {
            let batch = self.api.fetch_finance_actions(page_size, offset).await?;
            let batch_len = batch.len() as u32;
            all.extend(batch);
            if batch_len == 0 || batch_len < page_size {
                break;
            }
            offset += page_size;
        }

        Ok(all)
    }

    /// Page through the statistics feed until a short or empty page, capped.
    async fn fetch_stats_feed(
        &self,
        page_size: u32,
        cap: u32,
        from_date: &str,
    ) -> Result<Vec<StatsAction>, SyncError> {
        let mut all = Vec::new();
        let mut offset = 0u32;

        while offset < cap {
            let batch = self
                .api
                .fetch_stats_actions(page_size, offset, from_date)
                .await?;
            let batch_len = batch.len() as u32;
            all.extend(batch);
            if batch_len == 0 || batch_len < page_size {
                break;
            }
            offset += page_size;
        }

        Ok(all)
    }
}

/// Fold the finance feed into per-day rollups.
///
/// The day comes from the booking timestamp, then the remote update
/// timestamp, then `today`. Bookings count paid and confirmed records;
/// earnings sum the rolled-up profit of every record regardless of state.
fn build_daily_stats(finance: &[FinanceAction], today: &str) -> Vec<DailyStatRow> {
    let mut days: BTreeMap<String, DailyStatRow> = BTreeMap::new();

    for action in finance {
        let key: String = action
            .booked_at
            .as_deref()
            .or(action.updated_at.as_deref())
            .map(|ts| ts.chars().take(10).collect())
            .unwrap_or_default();
        let key = if key.is_empty() {
            today.to_string()
        } else {
            key
        };

        let entry = days.entry(key.clone()).or_insert_with(|| DailyStatRow {
            date: key,
            clicks: 0,
            bookings: 0,
            earnings: Money::zero(),
        });
        if action.state.counts_as_booking() {
            entry.bookings += 1;
        }
        entry.earnings += action.profit.unwrap_or_default();
    }

    days.into_values().collect()
}

/// Summary of one sync pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub reset: bool,
    pub finance_actions: usize,
    pub stats_actions: usize,
    pub merged_records: usize,
    pub inserted: usize,
    pub updated: usize,
    pub payments: usize,
    pub daily_days: usize,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] PartnerApiError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
