pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{MockPartnerApi, PartnerApi, PartnerApiError, TravelpayoutsApi};
pub use db::{init_db, Repository};
pub use domain::{
    ActionId, ActionRecord, ActionState, CampaignId, CurrencyAmounts, FinanceAction, Money,
    MonthKey, Payment, StatsAction,
};
pub use error::AppError;
pub use orchestration::{ModelService, SyncRunner};
