use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use tracing::info;

pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to the submissions Postgres instance")?;

        Ok(Self {
            database_url,
            max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
}
