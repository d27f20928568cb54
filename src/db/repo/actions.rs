//! Canonical action record and profit aggregate operations.

use crate::domain::{ActionId, ActionRecord, ActionState, CampaignId, Money};
use crate::engine::merge_stored;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeMap;

use super::{parse_money, AggregateRow, GroupBy, Repository, UpsertStats};

const DATE_BUCKET_LIMIT: usize = 365;
const MONTH_BUCKET_LIMIT: usize = 48;
const PROGRAM_BUCKET_LIMIT: usize = 100;

const ACTION_COLUMNS: &str = "action_id, campaign_id, action_state, currency, price, profit, \
     paid_profit, processing_profit, description, booked_at, updated_at_remote";

impl Repository {
    /// Upsert merged records keyed by canonical action id.
    ///
    /// Each record is merged over the stored row with the same id inside one
    /// transaction, so a sync pass either lands fully or not at all.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn upsert_actions_batch(
        &self,
        records: &[ActionRecord],
    ) -> Result<UpsertStats, sqlx::Error> {
        if records.is_empty() {
            return Ok(UpsertStats::default());
        }

        let mut stats = UpsertStats::default();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let existing = sqlx::query(&format!(
                "SELECT {} FROM actions WHERE action_id = ?",
                ACTION_COLUMNS
            ))
            .bind(record.id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row_to_record(&row));

            let merged = match &existing {
                Some(stored) => merge_stored(stored, record),
                None => record.clone(),
            };

            if existing.is_some() {
                sqlx::query(
                    r#"
                    UPDATE actions SET
                        campaign_id = ?,
                        action_state = ?,
                        currency = ?,
                        price = ?,
                        profit = ?,
                        paid_profit = ?,
                        processing_profit = ?,
                        description = ?,
                        booked_at = ?,
                        updated_at_remote = ?
                    WHERE action_id = ?
                    "#,
                )
                .bind(merged.campaign_id.as_i64())
                .bind(merged.state.as_str())
                .bind(merged.currency.as_deref())
                .bind(money_or_zero(merged.price))
                .bind(money_or_zero(merged.profit))
                .bind(merged.paid_profit.map(|m| m.to_canonical_string()))
                .bind(merged.processing_profit.map(|m| m.to_canonical_string()))
                .bind(&merged.description)
                .bind(merged.booked_at.as_deref())
                .bind(merged.updated_at_remote.as_deref())
                .bind(merged.id.as_str())
                .execute(&mut *tx)
                .await?;
                stats.updated += 1;
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO actions (
                        action_id, campaign_id, action_state, currency, price, profit,
                        paid_profit, processing_profit, description, booked_at, updated_at_remote
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(merged.id.as_str())
                .bind(merged.campaign_id.as_i64())
                .bind(merged.state.as_str())
                .bind(merged.currency.as_deref())
                .bind(money_or_zero(merged.price))
                .bind(money_or_zero(merged.profit))
                .bind(merged.paid_profit.map(|m| m.to_canonical_string()))
                .bind(merged.processing_profit.map(|m| m.to_canonical_string()))
                .bind(&merged.description)
                .bind(merged.booked_at.as_deref())
                .bind(merged.updated_at_remote.as_deref())
                .execute(&mut *tx)
                .await?;
                stats.inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(stats)
    }

    /// Look up one stored record by canonical id.
    pub async fn get_action(&self, id: &ActionId) -> Result<Option<ActionRecord>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM actions WHERE action_id = ?",
            ACTION_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_record(&r)))
    }

    /// Count stored records.
    pub async fn count_actions(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM actions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// List stored records by most recent remote update, paged.
    pub async fn list_actions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActionRecord>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM actions ORDER BY updated_at_remote DESC LIMIT ? OFFSET ?",
            ACTION_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Aggregate stored records into profit buckets along the given axis.
    ///
    /// Sums are folded in Rust to keep decimal precision; SQLite's SUM would
    /// go through REAL. Rows without any timestamp are skipped for the date
    /// and month axes.
    pub async fn aggregate_actions(
        &self,
        group_by: GroupBy,
    ) -> Result<Vec<AggregateRow>, sqlx::Error> {
        let rows = sqlx::query(&format!("SELECT {} FROM actions", ACTION_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

        for row in &rows {
            let record = row_to_record(row);
            let key = match group_by {
                GroupBy::Date => match bucket_key(&record, 10) {
                    Some(key) => key,
                    None => continue,
                },
                GroupBy::Month => match bucket_key(&record, 7) {
                    Some(key) => key,
                    None => continue,
                },
                GroupBy::Program => record.campaign_id.to_string(),
            };

            let bucket = buckets.entry(key).or_default();
            bucket.actions += 1;

            let profit = record.profit.unwrap_or_default();
            if record.state.is_paid() {
                bucket.paid += 1;
                bucket.paid_profit += record.paid_profit.unwrap_or(profit);
            } else if record.state.is_processing() {
                bucket.processing += 1;
                bucket.pending_profit += record.processing_profit.unwrap_or(profit);
            } else if record.state.is_cancelled() {
                bucket.cancelled += 1;
            }
        }

        let mut aggregates: Vec<AggregateRow> = buckets
            .into_iter()
            .map(|(key, bucket)| bucket.into_row(key))
            .collect();

        match group_by {
            GroupBy::Date => {
                aggregates.sort_by(|a, b| b.key.cmp(&a.key));
                aggregates.truncate(DATE_BUCKET_LIMIT);
            }
            GroupBy::Month => {
                aggregates.sort_by(|a, b| b.key.cmp(&a.key));
                aggregates.truncate(MONTH_BUCKET_LIMIT);
            }
            GroupBy::Program => {
                aggregates.sort_by(|a, b| b.total_profit_rub.cmp(&a.total_profit_rub));
                aggregates.truncate(PROGRAM_BUCKET_LIMIT);
            }
        }

        Ok(aggregates)
    }
}

#[derive(Debug, Default)]
struct Bucket {
    actions: i64,
    paid: i64,
    processing: i64,
    cancelled: i64,
    paid_profit: Money,
    pending_profit: Money,
}

impl Bucket {
    fn into_row(self, key: String) -> AggregateRow {
        let total = self.paid_profit + self.pending_profit;
        let bookings = self.paid + self.processing;
        let avg = if bookings > 0 {
            total.div_count(bookings)
        } else {
            Money::zero()
        };

        AggregateRow {
            key,
            actions: self.actions,
            paid_count: self.paid,
            processing_count: self.processing,
            cancelled_count: self.cancelled,
            paid_profit_rub: self.paid_profit,
            pending_profit_rub: self.pending_profit,
            total_profit_rub: total,
            avg_profit_per_booking_rub: avg,
        }
    }
}

/// Bucket key from the booking timestamp, falling back to the remote update
/// timestamp; `len` 10 keeps the day, 7 the month.
fn bucket_key(record: &ActionRecord, len: usize) -> Option<String> {
    let ts = record
        .booked_at
        .as_deref()
        .or(record.updated_at_remote.as_deref())?;
    ts.get(..len).map(|s| s.to_string())
}

fn money_or_zero(value: Option<Money>) -> String {
    value.unwrap_or_default().to_canonical_string()
}

fn row_to_record(row: &SqliteRow) -> ActionRecord {
    let action_id: String = row.get("action_id");
    let state: String = row.get("action_state");
    let price: String = row.get("price");
    let profit: String = row.get("profit");
    let paid_profit: Option<String> = row.get("paid_profit");
    let processing_profit: Option<String> = row.get("processing_profit");

    ActionRecord {
        id: ActionId::new(action_id),
        campaign_id: CampaignId::new(row.get("campaign_id")),
        state: ActionState::new(state),
        currency: row.get("currency"),
        price: Some(parse_money("price", &price)),
        profit: Some(parse_money("profit", &profit)),
        paid_profit: paid_profit.map(|s| parse_money("paid_profit", &s)),
        processing_profit: processing_profit.map(|s| parse_money("processing_profit", &s)),
        description: row.get("description"),
        booked_at: row.get("booked_at"),
        updated_at_remote: row.get("updated_at_remote"),
    }
}
