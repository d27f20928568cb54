//! One-shot seeder for a fresh database: forecast datapoints, the
//! anchor-month actuals, and the login codephrase hash.
//!
//! Usage:
//!   DATABASE_PATH=tracker.db CODEPHRASE=... cargo run --bin seed

use anyhow::{Context, Result};
use faretrack::api::auth::hash_codephrase;
use faretrack::db::init_db;
use faretrack::domain::MonthKey;
use faretrack::Repository;

const DATAPOINTS: [(&str, f64); 9] = [
    ("commissionPerBookingRub", 580.0),
    ("targetConversionPct", 3.0),
    ("retentionPct", 30.0),
    ("cpaStartRub", 60.0),
    ("cpaMonthlyGrowthPct", 1.5),
    ("marketingShareTopPct", 85.0),
    ("paidSubsPct", 1.5),
    ("subsRevenueRub", 269.0),
    ("defaultNewOrganic", 2500.0),
];

/// Observed figures for the anchor month the projection starts from.
const ANCHOR_OVERRIDES: [(&str, f64); 7] = [
    ("endUsers", 31719.0),
    ("retention2", 5646.0),
    ("mau", 11354.0),
    ("paidSubsCount", 0.0),
    ("marketingSpend", 18000.0),
    ("newPaidUsers", 170.0),
    ("newOrganic", 5538.0),
];

#[tokio::main]
async fn main() -> Result<()> {
    let database_path =
        std::env::var("DATABASE_PATH").context("DATABASE_PATH must be set")?;
    let anchor: MonthKey = std::env::var("MODEL_ANCHOR_MONTH")
        .unwrap_or_else(|_| "2025-07".to_string())
        .parse()
        .context("MODEL_ANCHOR_MONTH must be formatted YYYY-MM")?;

    let pool = init_db(&database_path)
        .await
        .with_context(|| format!("failed to open database at {}", database_path))?;
    let repo = Repository::new(pool);

    for (key, value) in DATAPOINTS {
        repo.set_datapoint(key, value).await?;
    }
    println!("Seeded {} model datapoints", DATAPOINTS.len());

    for (metric, value) in ANCHOR_OVERRIDES {
        repo.set_override(&anchor, metric, value).await?;
    }
    println!("Seeded {} overrides for {}", ANCHOR_OVERRIDES.len(), anchor);

    match std::env::var("CODEPHRASE") {
        Ok(codephrase) if !codephrase.is_empty() => {
            repo.set_codephrase_hash(&hash_codephrase(&codephrase))
                .await?;
            println!("Stored codephrase hash");
        }
        _ => println!("CODEPHRASE not set, login stays locked"),
    }

    Ok(())
}
