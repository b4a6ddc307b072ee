//! Runtime settings: defaults, optional `recon.toml`, `RECON_*` env vars.
//! CLI flags override whatever is loaded here.

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::similarity::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fuzzy-conflict threshold in [0, 1].
    pub threshold: f64,
    pub publications_file: String,
    pub news_file: String,
    pub media_file: String,
    pub output_file: String,
    pub decision_db: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            threshold: DEFAULT_THRESHOLD,
            publications_file: "publications_data.csv".into(),
            news_file: "news_data.csv".into(),
            media_file: "media_data.csv".into(),
            output_file: "combined_data.csv".into(),
            decision_db: "data/decisions.sqlite".into(),
        }
    }
}

pub fn load() -> Result<Settings> {
    let cfg = Config::builder()
        .add_source(config::File::with_name("recon").required(false))
        .add_source(config::Environment::with_prefix("RECON").try_parsing(true))
        .build()
        .context("Failed to read settings")?;
    let settings: Settings = cfg
        .try_deserialize()
        .context("Failed to deserialize settings")?;
    Ok(settings)
}
