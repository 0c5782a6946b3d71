//! Configuration for racepools.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RunError;
use crate::scraper::LISTING_URL;

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
}

fn default_listing_url() -> String {
    LISTING_URL.to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Chrome executable; platform default when unset
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_headless() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            user_agent: default_user_agent(),
        }
    }
}

/// Scrape timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,
    #[serde(default = "default_mtp_timeout_secs")]
    pub mtp_timeout_secs: u64,
    #[serde(default = "default_pools_timeout_secs")]
    pub pools_timeout_secs: u64,
    /// Settle delay after the pools table renders, for late-arriving amounts
    #[serde(default = "default_pools_settle_ms")]
    pub pools_settle_ms: u64,
    /// Pause between consecutive race detail visits
    #[serde(default = "default_inter_race_pause_ms")]
    pub inter_race_pause_ms: u64,
    /// Watchdog for the whole run; 0 disables it
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    /// chrono format of the store's race_date column
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_element_timeout_secs() -> u64 {
    10
}

fn default_mtp_timeout_secs() -> u64 {
    5
}

fn default_pools_timeout_secs() -> u64 {
    5
}

fn default_pools_settle_ms() -> u64 {
    2000
}

fn default_inter_race_pause_ms() -> u64 {
    2000
}

fn default_run_timeout_secs() -> u64 {
    300
}

fn default_date_format() -> String {
    "%m/%d/%Y".to_string()
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout_secs(),
            element_timeout_secs: default_element_timeout_secs(),
            mtp_timeout_secs: default_mtp_timeout_secs(),
            pools_timeout_secs: default_pools_timeout_secs(),
            pools_settle_ms: default_pools_settle_ms(),
            inter_race_pause_ms: default_inter_race_pause_ms(),
            run_timeout_secs: default_run_timeout_secs(),
            date_format: default_date_format(),
        }
    }
}

impl ScrapeConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn mtp_timeout(&self) -> Duration {
        Duration::from_secs(self.mtp_timeout_secs)
    }

    pub fn pools_timeout(&self) -> Duration {
        Duration::from_secs(self.pools_timeout_secs)
    }

    pub fn pools_settle(&self) -> Duration {
        Duration::from_millis(self.pools_settle_ms)
    }

    pub fn inter_race_pause(&self) -> Duration {
        Duration::from_millis(self.inter_race_pause_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    /// All waits and delays zeroed, for tests
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            navigation_timeout_secs: 0,
            element_timeout_secs: 0,
            mtp_timeout_secs: 0,
            pools_timeout_secs: 0,
            pools_settle_ms: 0,
            inter_race_pause_ms: 0,
            run_timeout_secs: 0,
            date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Rest,
    Sqlite,
}

/// Persistence service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub service_key: Option<String>,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_races_table")]
    pub races_table: String,
    #[serde(default = "default_runners_table")]
    pub runners_table: String,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Rest
}

fn default_sqlite_path() -> String {
    "data/racepools.db".to_string()
}

fn default_races_table() -> String {
    "drf_races".to_string()
}

fn default_runners_table() -> String {
    "drf_runners".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            service_key: None,
            sqlite_path: default_sqlite_path(),
            races_table: default_races_table(),
            runners_table: default_runners_table(),
        }
    }
}

impl StoreConfig {
    /// Base URL and key for the REST backend
    pub fn rest_credentials(&self) -> Result<(&str, &str), RunError> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(RunError::MissingConfig("store.url (SUPABASE_URL)"))?;
        let key = self
            .service_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(RunError::MissingConfig("store.service_key (SUPABASE_SERVICE_KEY)"))?;
        Ok((url, key))
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (RACEPOOLS_STORE__URL, etc.)
            .add_source(
                config::Environment::with_prefix("RACEPOOLS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Conventional names used by existing deployments
            .set_override_option("store.url", std::env::var("SUPABASE_URL").ok())?
            .set_override_option(
                "store.service_key",
                std::env::var("SUPABASE_SERVICE_KEY").ok(),
            )?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
