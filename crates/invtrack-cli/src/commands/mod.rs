//! Subcommand implementations.

pub mod config;
pub mod contracts;
pub mod extract;
pub mod forecast;
pub mod ingest;
pub mod invoices;
pub mod migrate;
pub mod output;
pub mod payments;
pub mod rates;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use chrono::{Local, NaiveDate};
use tracing::debug;

use invtrack_core::models::config::AppConfig;
use invtrack_store::{InvoiceStore, PgStore};

/// Settings shared by every command that touches data.
pub struct Context {
    pub config: AppConfig,
}

impl Context {
    /// Load the configuration from `path`, the default location, or the
    /// built-in defaults, in that order.
    pub fn load(path: Option<&Path>, database_url: Option<String>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    AppConfig::from_file(&default_path)?
                } else {
                    AppConfig::default()
                }
            }
        };

        if let Some(url) = database_url {
            config.database.url = url;
        }
        Ok(Self { config })
    }

    /// Connect to the configured database.
    pub async fn store(&self) -> anyhow::Result<Arc<dyn InvoiceStore>> {
        Ok(Arc::new(self.pg_store().await?))
    }

    pub async fn pg_store(&self) -> anyhow::Result<PgStore> {
        debug!("Connecting to database");
        PgStore::connect(&self.config.database)
            .await
            .context("Failed to connect to the database")
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invtrack")
        .join("config.json")
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
