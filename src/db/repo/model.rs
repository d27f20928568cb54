//! Forecast datapoint, override, and codephrase auth operations.

use crate::domain::MonthKey;
use sqlx::Row;

use super::{OverrideRow, Repository};

impl Repository {
    /// Fetch all stored forecast datapoints as key/value pairs.
    pub async fn get_datapoints(&self) -> Result<Vec<(String, f64)>, sqlx::Error> {
        let rows = sqlx::query("SELECT key, value FROM model_datapoints ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }

    /// Upsert one forecast datapoint.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn set_datapoint(&self, key: &str, value: f64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO model_datapoints (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch all stored per-month overrides.
    pub async fn get_overrides(&self) -> Result<Vec<OverrideRow>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT month_key, metric, value FROM model_overrides ORDER BY month_key, metric",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| OverrideRow {
                month_key: row.get("month_key"),
                metric: row.get("metric"),
                value: row.get("value"),
            })
            .collect())
    }

    /// Upsert one per-month override.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn set_override(
        &self,
        month: &MonthKey,
        metric: &str,
        value: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO model_overrides (month_key, metric, value)
            VALUES (?, ?, ?)
            ON CONFLICT(month_key, metric) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
        )
        .bind(month.to_string())
        .bind(metric)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete one per-month override. Returns whether a row was removed.
    pub async fn delete_override(
        &self,
        month: &MonthKey,
        metric: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM model_overrides WHERE month_key = ? AND metric = ?")
            .bind(month.to_string())
            .bind(metric)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get the stored codephrase hash, if provisioned.
    pub async fn get_codephrase_hash(&self) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT codephrase_hash FROM codephrase_auth WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("codephrase_hash")))
    }

    /// Set the codephrase hash, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn set_codephrase_hash(&self, hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO codephrase_auth (id, codephrase_hash)
            VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET codephrase_hash = excluded.codephrase_hash
            "#,
        )
        .bind(hash)
        .execute(&self.pool)
        .await?;

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

    #[tokio::test]
    async fn test_datapoint_upsert_last_write_wins() {
        let (repo, _temp) = setup_test_db().await;

        repo.set_datapoint("commissionPerBookingRub", 580.0)
            .await
            .unwrap();
        repo.set_datapoint("commissionPerBookingRub", 600.0)
            .await
            .unwrap();
        repo.set_datapoint("targetConversionPct", 3.0).await.unwrap();

        let datapoints = repo.get_datapoints().await.unwrap();
        assert_eq!(
            datapoints,
            vec![
                ("commissionPerBookingRub".to_string(), 600.0),
                ("targetConversionPct".to_string(), 3.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_override_set_and_delete() {
        let (repo, _temp) = setup_test_db().await;
        let month = MonthKey::new(2025, 7);

        repo.set_override(&month, "bookings", 350.0).await.unwrap();
        repo.set_override(&month, "bookings", 360.0).await.unwrap();
        repo.set_override(&month, "marketingSpend", 18000.0)
            .await
            .unwrap();

        let rows = repo.get_overrides().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month_key, "2025-07");
        assert_eq!(rows[0].metric, "bookings");
        assert_eq!(rows[0].value, 360.0);

        assert!(repo.delete_override(&month, "bookings").await.unwrap());
        assert!(!repo.delete_override(&month, "bookings").await.unwrap());
        assert_eq!(repo.get_overrides().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_codephrase_hash_roundtrip() {
        let (repo, _temp) = setup_test_db().await;

        assert!(repo.get_codephrase_hash().await.unwrap().is_none());

        repo.set_codephrase_hash("abc123").await.unwrap();
        assert_eq!(
            repo.get_codephrase_hash().await.unwrap().as_deref(),
            Some("abc123")
        );

        repo.set_codephrase_hash("def456").await.unwrap();
        assert_eq!(
            repo.get_codephrase_hash().await.unwrap().as_deref(),
            Some("def456")
        );
    }
}
