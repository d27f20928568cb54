//! Domain primitives: ActionId, CampaignId, ActionState, MonthKey.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical transaction identifier of the form `"{campaignId}:{rawId}"`.
///
/// The two upstream feeds refer to the same transaction with differently
/// prefixed ids; canonicalization makes them collide on one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    /// Wrap an already-canonical id.
    pub fn new(id: String) -> Self {
        ActionId(id)
    }

    /// Canonicalize a raw feed id: prefix `"{campaignId}:"` unless the id
    /// already starts with a numeric campaign prefix.
    ///
    /// Idempotent: canonicalizing a canonical id returns it unchanged.
    pub fn canonical(raw: &str, campaign_id: i64) -> Self {
        if has_campaign_prefix(raw) {
            ActionId(raw.to_string())
        } else {
            ActionId(format!("{}:{}", campaign_id, raw))
        }
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True if the id starts with one or more ASCII digits followed by a colon.
fn has_campaign_prefix(id: &str) -> bool {
    match id.find(':') {
        Some(pos) if pos > 0 => id[..pos].bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}

/// Partner program identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub i64);

impl CampaignId {
    /// Create a CampaignId.
    pub fn new(id: i64) -> Self {
        CampaignId(id)
    }

    /// Get the underlying integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction state as reported by the partner feeds.
///
/// Open string enumeration; the values observed in practice are `paid`,
/// `processing`, `cancelled`/`canceled`, and `confirmed`. Comparisons are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionState(pub String);

impl ActionState {
    /// Create an ActionState from a string.
    pub fn new(state: String) -> Self {
        ActionState(state)
    }

    /// Get the state as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the `paid` state.
    pub fn is_paid(&self) -> bool {
        self.0.eq_ignore_ascii_case("paid")
    }

    /// True for the `processing` state.
    pub fn is_processing(&self) -> bool {
        self.0.eq_ignore_ascii_case("processing")
    }

    /// True for the `cancelled` state (both spellings).
    pub fn is_cancelled(&self) -> bool {
        self.0.eq_ignore_ascii_case("cancelled") || self.0.eq_ignore_ascii_case("canceled")
    }

    /// True for the `confirmed` state.
    pub fn is_confirmed(&self) -> bool {
        self.0.eq_ignore_ascii_case("confirmed")
    }

    /// True if the transaction counts as a completed booking (paid or
    /// confirmed) for daily statistics.
    pub fn counts_as_booking(&self) -> bool {
        self.is_paid() || self.is_confirmed()
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing a `YYYY-MM` month key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key {0:?}, expected YYYY-MM")]
pub struct MonthKeyParseError(pub String);

/// Calendar month identifier, rendered as `YYYY-MM`.
///
/// Orders chronologically; serializes as the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Create a MonthKey. `month` must be in 1..=12.
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        MonthKey { year, month }
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// `count` consecutive months starting at `start`.
    pub fn sequence(start: MonthKey, count: usize) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(count);
        let mut current = start;
        for _ in 0..count {
            months.push(current);
            current = current.next();
        }
        months
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MonthKeyParseError(s.to_string());
        let (year_part, month_part) = s.split_once('-').ok_or_else(invalid)?;
        if year_part.len() != 4 || month_part.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(MonthKey { year, month })
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
