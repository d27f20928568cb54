//! Numeric helpers shared by the projection recurrence.

/// Round to the nearest integer, ties toward positive infinity.
///
/// The recurrence rounds every stock metric this way; `f64::round` would
/// send -0.5 to -1 instead of 0.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Compound growth multiplier after `periods` months at `pct` percent per month.
pub fn growth_factor(pct: f64, periods: usize) -> f64 {
    (1.0 + pct / 100.0).powi(periods as i32)
}

/// Whole users acquirable with `marketing` spend at `cpa` per user, floored
/// and clamped at zero.
///
/// A non-positive CPA yields 0 rather than a non-finite count.
pub fn acquirable_users(marketing: f64, cpa: f64) -> f64 {
    if cpa > 0.0 {
        (marketing / cpa).floor().max(0.0)
    } else {
        0.0
    }
}
