//! Forecast model assembly from stored parameters, overrides, and actuals.

use crate::config::Config;
use crate::db::repo::GroupBy;
use crate::db::Repository;
use crate::domain::MonthKey;
use crate::engine::{
    compute_projection, compute_totals, ModelParams, ModelSeeds, MonthRow, OverrideMetric,
    OverrideSet, ProjectionTotals,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Assembles the forecast inputs and computes the projection.
#[derive(Clone)]
pub struct ModelService {
    repo: Arc<Repository>,
    config: Config,
}

/// The fully assembled forecast, ready for serving.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelView {
    pub months: Vec<MonthKey>,
    pub params: ModelParams,
    pub seeds: ModelSeeds,
    pub overrides: OverrideSet,
    pub rows: Vec<MonthRow>,
    pub totals: ProjectionTotals,
}

impl ModelService {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self { repo, config }
    }

    /// Load stored inputs and compute the projection.
    ///
    /// Layering order: built-in defaults, then stored datapoints, then
    /// anchor-month override rows feeding the seeds, then anchor-month
    /// actuals from the synced records. Unknown datapoint keys and metrics
    /// are logged and skipped; an aggregate failure leaves the actuals at
    /// their defaults rather than failing the load.
    pub async fn load(&self) -> Result<ModelView, sqlx::Error> {
        let mut params = ModelParams::default();
        for (key, value) in self.repo.get_datapoints().await? {
            if !params.apply_datapoint(&key, value) {
                warn!("Ignoring unknown model datapoint key {}", key);
            }
        }

        let anchor = self.config.model_anchor_month;
        let mut seeds = ModelSeeds::default();
        let mut overrides = OverrideSet::default();

        for row in self.repo.get_overrides().await? {
            let month = match row.month_key.parse::<MonthKey>() {
                Ok(month) => month,
                Err(e) => {
                    warn!(
                        "Ignoring override with bad month key {}: {}",
                        row.month_key, e
                    );
                    continue;
                }
            };

            // Anchor-month stock figures seed the recurrence instead of
            // overriding a computed column.
            if month == anchor {
                match row.metric.as_str() {
                    "endUsers" => {
                        seeds.end_users = row.value;
                        continue;
                    }
                    "retention2" => {
                        seeds.retention2 = row.value;
                        continue;
                    }
                    "mau" => {
                        seeds.mau = row.value;
                        continue;
                    }
                    _ => {}
                }
            }

            match OverrideMetric::parse(&row.metric) {
                Some(metric) => overrides.set(metric, month, row.value),
                None => warn!("Ignoring override with unknown metric {}", row.metric),
            }
        }

        self.apply_anchor_actuals(&mut seeds, &mut overrides, anchor)
            .await;

        let months = MonthKey::sequence(anchor, self.config.model_horizon_months);
        let rows = compute_projection(&months, &params, &seeds, &overrides);
        let totals = compute_totals(&rows);

        Ok(ModelView {
            months,
            params,
            seeds,
            overrides,
            rows,
            totals,
        })
    }

    /// Fold synced actuals for the anchor month into the forecast inputs:
    /// observed bookings become the anchor bookings override (unless one is
    /// already set) and the observed per-booking commission replaces the
    /// commission formula for that month.
    async fn apply_anchor_actuals(
        &self,
        seeds: &mut ModelSeeds,
        overrides: &mut OverrideSet,
        anchor: MonthKey,
    ) {
        let aggregates = match self.repo.aggregate_actions(GroupBy::Month).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping anchor-month actuals, aggregate query failed: {}", e);
                return;
            }
        };

        let anchor_key = anchor.to_string();
        let row = match aggregates.iter().find(|r| r.key == anchor_key) {
            Some(row) => row,
            None => return,
        };

        let bookings = row.paid_count + row.processing_count;
        if bookings > 0 {
            seeds.observed_commission_rub =
                Some(row.total_profit_rub.to_f64_lossy() / bookings as f64);
            if !overrides.bookings.contains_key(&anchor) {
                overrides.set(OverrideMetric::Bookings, anchor, bookings as f64);
            }
        }
    }
}
