use std::env;

use anyhow::{anyhow, Context};
pub use types::{Filters, Settings, Thresholds};

mod types;

const DEFAULT_DB_PATH: &str = "ledger.db";
const DEFAULT_FILTERS_PATH: &str = "./filters.json";
const DEFAULT_LOG_LEVEL: &str = "info";

fn required_var(name: &str) -> Result<String, anyhow::Error> {
    env::var(name).map_err(|_| anyhow!("please set {}", name))
}

fn required_id(name: &str) -> Result<u64, anyhow::Error> {
    required_var(name)?
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{} is not a numeric id", name))
}

impl Settings {
    /// Reads settings from the process environment. `.env` is loaded by the caller
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            bot_token: required_var("TOKEN_BOT")?,
            guild_id: required_id("ID_GUILD")?,
            feedback_channel_id: required_id("ID_CH__FEEDBACK")?,
            announcement_channel_id: required_id("ID_CH__FEEDBACK_LINKS")?,
            db_path: env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            filters_path: env::var("FILTERS_PATH")
                .unwrap_or_else(|_| DEFAULT_FILTERS_PATH.to_string()),
            log_level: env::var("LOG_LVL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

impl Filters {
    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &str) -> Result<Self, anyhow::Error> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read filters from {}", path))?;
        Self::from_json(&json)
    }
}
