//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `actions.rs` - canonical action records and profit aggregates
//! - `model.rs` - forecast datapoints, overrides, and codephrase auth
//!
//! Snapshot, daily-statistics, and payment operations live here.

mod actions;
mod model;

use crate::domain::{CurrencyAmounts, Money, Payment};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::warn;

/// A captured balance or next-payout snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub captured_at: String,
    pub amounts: CurrencyAmounts,
}

/// One per-day rollup row derived from the finance feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStatRow {
    pub date: String,
    pub clicks: i64,
    pub bookings: i64,
    pub earnings: Money,
}

/// One profit aggregate bucket (by day, month, or program).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub key: String,
    pub actions: i64,
    pub paid_count: i64,
    pub processing_count: i64,
    pub cancelled_count: i64,
    pub paid_profit_rub: Money,
    pub pending_profit_rub: Money,
    pub total_profit_rub: Money,
    pub avg_profit_per_booking_rub: Money,
}

/// Grouping axis for profit aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Date,
    Month,
    Program,
}

/// One stored forecast override row.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRow {
    pub month_key: String,
    pub metric: String,
    pub value: f64,
}

/// Counts reported by a batch action upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Parse a stored canonical decimal, warning and using zero on corrupt data.
fn parse_money(field: &str, raw: &str) -> Money {
    Money::from_str_canonical(raw).unwrap_or_else(|e| {
        warn!(
            field = field,
            value = %raw,
            error = %e,
            "Failed to parse stored amount, using zero"
        );
        Money::zero()
    })
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Snapshot operations
    // =========================================================================

    /// Record a balance snapshot.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_balance_snapshot(
        &self,
        amounts: &CurrencyAmounts,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO balance_snapshots (usd, eur, rub)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(amounts.usd.to_canonical_string())
        .bind(amounts.eur.to_canonical_string())
        .bind(amounts.rub.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a next-payout snapshot.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_next_payout_snapshot(
        &self,
        amounts: &CurrencyAmounts,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO next_payout_snapshots (usd, eur, rub)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(amounts.usd.to_canonical_string())
        .bind(amounts.eur.to_canonical_string())
        .bind(amounts.rub.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the most recent balance snapshot, if any.
    pub async fn latest_balance_snapshot(&self) -> Result<Option<SnapshotRow>, sqlx::Error> {
        self.latest_snapshot("balance_snapshots").await
    }

    /// Get the most recent next-payout snapshot, if any.
    pub async fn latest_next_payout_snapshot(&self) -> Result<Option<SnapshotRow>, sqlx::Error> {
        self.latest_snapshot("next_payout_snapshots").await
    }

    async fn latest_snapshot(&self, table: &str) -> Result<Option<SnapshotRow>, sqlx::Error> {
        // Table names are fixed by the two public wrappers.
        let sql = format!(
            "SELECT captured_at, usd, eur, rub FROM {} ORDER BY id DESC LIMIT 1",
            table
        );
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

        Ok(row.map(|r| {
            let usd: String = r.get("usd");
            let eur: String = r.get("eur");
            let rub: String = r.get("rub");
            SnapshotRow {
                captured_at: r.get("captured_at"),
                amounts: CurrencyAmounts {
                    usd: parse_money("usd", &usd),
                    eur: parse_money("eur", &eur),
                    rub: parse_money("rub", &rub),
                },
            }
        }))
    }

    // =========================================================================
    // Daily statistics operations
    // =========================================================================

    /// Upsert per-day rollups keyed by date.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn upsert_daily_stats(&self, rows: &[DailyStatRow]) -> Result<(), sqlx::Error> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO daily_stats (date, clicks, bookings, earnings)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(date) DO UPDATE SET
                    clicks = excluded.clicks,
                    bookings = excluded.bookings,
                    earnings = excluded.earnings
                "#,
            )
            .bind(&row.date)
            .bind(row.clicks)
            .bind(row.bookings)
            .bind(row.earnings.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List daily rollups, newest date first.
    pub async fn list_daily_stats(&self, limit: i64) -> Result<Vec<DailyStatRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT date, clicks, bookings, earnings
            FROM daily_stats
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let earnings: String = row.get("earnings");
                DailyStatRow {
                    date: row.get("date"),
                    clicks: row.get("clicks"),
                    bookings: row.get("bookings"),
                    earnings: parse_money("earnings", &earnings),
                }
            })
            .collect())
    }

    // =========================================================================
    // Payment operations
    // =========================================================================

    /// Upsert payments keyed by payment uuid.
    ///
    /// Amount, currency, and comment follow the incoming record; the original
    /// paid-at timestamp and payment info id are kept once stored.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn upsert_payments_batch(&self, payments: &[Payment]) -> Result<usize, sqlx::Error> {
        if payments.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for payment in payments {
            sqlx::query(
                r#"
                INSERT INTO payments (payment_uuid, paid_at, amount, currency, payment_info_id, comment)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(payment_uuid) DO UPDATE SET
                    amount = excluded.amount,
                    currency = excluded.currency,
                    comment = excluded.comment
                "#,
            )
            .bind(&payment.payment_uuid)
            .bind(&payment.paid_at)
            .bind(payment.amount.to_canonical_string())
            .bind(&payment.currency)
            .bind(payment.payment_info_id)
            .bind(payment.comment.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(payments.len())
    }

    /// List payments, most recent paid-at first.
    pub async fn list_payments(&self, limit: i64) -> Result<Vec<Payment>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT payment_uuid, paid_at, amount, currency, payment_info_id, comment
            FROM payments
            ORDER BY paid_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let amount: String = row.get("amount");
                Payment {
                    payment_uuid: row.get("payment_uuid"),
                    paid_at: row.get("paid_at"),
                    amount: parse_money("amount", &amount),
                    currency: row.get("currency"),
                    payment_info_id: row.get("payment_info_id"),
                    comment: row.get("comment"),
                }
            })
            .collect())
    }

    // =========================================================================
    // Maintenance operations
    // =========================================================================

    /// Delete all stored actions. Returns the number of deleted rows.
    pub async fn clear_actions(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM actions").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete actions and daily rollups ahead of a full resync.
    pub async fn reset_sync_data(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM actions").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM daily_stats")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn amounts(usd: i64, eur: i64, rub: i64) -> CurrencyAmounts {
        CurrencyAmounts {
            usd: Money::from(usd),
            eur: Money::from(eur),
            rub: Money::from(rub),
        }
    }

    #[tokio::test]
    async fn test_latest_balance_snapshot() {
        let (repo, _temp) = setup_test_db().await;

        assert!(repo.latest_balance_snapshot().await.unwrap().is_none());

        repo.insert_balance_snapshot(&amounts(1, 2, 3)).await.unwrap();
        repo.insert_balance_snapshot(&amounts(10, 20, 30))
            .await
            .unwrap();

        let latest = repo.latest_balance_snapshot().await.unwrap().unwrap();
        assert_eq!(latest.amounts, amounts(10, 20, 30));
        assert!(!latest.captured_at.is_empty());
    }

    #[tokio::test]
    async fn test_balance_and_payout_snapshots_separate() {
        let (repo, _temp) = setup_test_db().await;

        repo.insert_balance_snapshot(&amounts(1, 1, 1)).await.unwrap();
        repo.insert_next_payout_snapshot(&amounts(2, 2, 2))
            .await
            .unwrap();

        let balance = repo.latest_balance_snapshot().await.unwrap().unwrap();
        let payout = repo.latest_next_payout_snapshot().await.unwrap().unwrap();
        assert_eq!(balance.amounts.rub, Money::from(1));
        assert_eq!(payout.amounts.rub, Money::from(2));
    }

    #[tokio::test]
    async fn test_daily_stats_upsert_replaces_by_date() {
        let (repo, _temp) = setup_test_db().await;

        let day = DailyStatRow {
            date: "2025-07-01".to_string(),
            clicks: 0,
            bookings: 2,
            earnings: Money::from(100),
        };
        repo.upsert_daily_stats(&[day.clone()]).await.unwrap();

        let revised = DailyStatRow {
            bookings: 3,
            earnings: Money::from(150),
            ..day
        };
        repo.upsert_daily_stats(&[revised.clone()]).await.unwrap();

        let rows = repo.list_daily_stats(10).await.unwrap();
        assert_eq!(rows, vec![revised]);
    }

    #[tokio::test]
    async fn test_daily_stats_ordered_newest_first() {
        let (repo, _temp) = setup_test_db().await;

        let rows = vec![
            DailyStatRow {
                date: "2025-07-01".to_string(),
                clicks: 0,
                bookings: 1,
                earnings: Money::from(10),
            },
            DailyStatRow {
                date: "2025-07-03".to_string(),
                clicks: 0,
                bookings: 1,
                earnings: Money::from(30),
            },
            DailyStatRow {
                date: "2025-07-02".to_string(),
                clicks: 0,
                bookings: 1,
                earnings: Money::from(20),
            },
        ];
        repo.upsert_daily_stats(&rows).await.unwrap();

        let listed = repo.list_daily_stats(2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].date, "2025-07-03");
        assert_eq!(listed[1].date, "2025-07-02");
    }

    #[tokio::test]
    async fn test_payments_upsert_keeps_paid_at() {
        let (repo, _temp) = setup_test_db().await;

        let payment = Payment {
            payment_uuid: "pay-1".to_string(),
            paid_at: "2025-07-10".to_string(),
            amount: Money::from(5000),
            currency: "rub".to_string(),
            payment_info_id: Some(7),
            comment: None,
        };
        repo.upsert_payments_batch(&[payment.clone()]).await.unwrap();

        let mut revised = payment.clone();
        revised.paid_at = "2099-01-01".to_string();
        revised.amount = Money::from(6000);
        revised.comment = Some("adjusted".to_string());
        repo.upsert_payments_batch(&[revised]).await.unwrap();

        let listed = repo.list_payments(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].paid_at, "2025-07-10");
        assert_eq!(listed[0].amount, Money::from(6000));
        assert_eq!(listed[0].comment.as_deref(), Some("adjusted"));
    }

    #[tokio::test]
    async fn test_reset_sync_data_clears_actions_and_daily() {
        let (repo, _temp) = setup_test_db().await;

        repo.upsert_daily_stats(&[DailyStatRow {
            date: "2025-07-01".to_string(),
            clicks: 0,
            bookings: 1,
            earnings: Money::from(10),
        }])
        .await
        .unwrap();

        repo.reset_sync_data().await.unwrap();
        assert!(repo.list_daily_stats(10).await.unwrap().is_empty());
        assert_eq!(repo.count_actions().await.unwrap(), 0);
    }
}
