//! Domain types for the affiliate revenue tracker.
//!
//! This module provides:
//! - Lossless monetary amounts via the Money wrapper
//! - Domain primitives: ActionId, CampaignId, ActionState, MonthKey
//! - Feed records (FinanceAction, StatsAction) and the canonical merged
//!   ActionRecord with its id canonicalization rule

pub mod action;
pub mod money;
pub mod primitives;

pub use action::{ActionDetails, ActionRecord, CurrencyAmounts, FinanceAction, Payment, StatsAction};
pub use money::Money;
pub use primitives::{ActionId, ActionState, CampaignId, MonthKey, MonthKeyParseError};
