use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{anyhow, bail, Context};
use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub data_api_url: String,
    pub geojson_path: PathBuf,
    pub page_size: i64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("PORT", "5000")?,
            data_api_url: try_load("DATA_API_URL", "http://127.0.0.1:5000")?,
            geojson_path: try_load("GEOJSON_PATH", "static/data/maharashtradist.geojson")?,
            page_size: check_page_size(try_load("PAGE_SIZE", "1000")?)?,
        })
    }
}

pub fn database_url() -> anyhow::Result<String> {
    env::var("DATABASE_URL").context("DATABASE_URL must be set to the Postgres instance")
}

/// Paged reads only advance with a positive page size.
fn check_page_size(page_size: i64) -> anyhow::Result<i64> {
    if page_size < 1 {
        warn!("Invalid PAGE_SIZE value: {page_size}");
        bail!("PAGE_SIZE must be at least 1, got {page_size}");
    }
    Ok(page_size)
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("invalid {key} value {raw:?}: {e}")
    })
}
