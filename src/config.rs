use crate::domain::MonthKey;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub partner_api_url: String,
    pub partner_api_token: String,
    pub stats_lookback_days: i64,
    pub model_anchor_month: MonthKey,
    pub model_horizon_months: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let partner_api_url = env_map
            .get("PARTNER_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.travelpayouts.com".to_string());

        let partner_api_token = env_map
            .get("PARTNER_API_TOKEN")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("PARTNER_API_TOKEN".to_string()))?;

        let stats_lookback_days = env_map
            .get("STATS_LOOKBACK_DAYS")
            .map(|s| s.as_str())
            .unwrap_or("365")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "STATS_LOOKBACK_DAYS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;

        let model_anchor_month = env_map
            .get("MODEL_ANCHOR_MONTH")
            .map(|s| s.as_str())
            .unwrap_or("2025-07")
            .parse::<MonthKey>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "MODEL_ANCHOR_MONTH".to_string(),
                    "must be a YYYY-MM month key".to_string(),
                )
            })?;

        let model_horizon_months = env_map
            .get("MODEL_HORIZON_MONTHS")
            .map(|s| s.as_str())
            .unwrap_or("18")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "MODEL_HORIZON_MONTHS".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            partner_api_url,
            partner_api_token,
            stats_lookback_days,
            model_anchor_month,
            model_horizon_months,
        })
    }
}
