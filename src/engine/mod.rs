//! Pure computation engines for feed reconciliation and forecasting.

pub mod projection;
pub mod reconcile;
pub mod rounding;

pub use projection::{
    compute_projection, compute_totals, ModelParams, ModelSeeds, MonthRow, OverrideMetric,
    OverrideSet, ProjectionTotals,
};
pub use reconcile::{merge_feeds, merge_stored};
pub use rounding::round_half_up;
