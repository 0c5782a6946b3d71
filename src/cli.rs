//! CLI commands for racepools.
//!
//! `run` performs one scrape pass against the live site; the `inspect-*`
//! commands run the page parsers over saved HTML snapshots.

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, StoreBackend};
use crate::normalize::normalize_runner_row;
use crate::pipeline::{print_summary_table, Pipeline};
use crate::scraper::parsers::{ListingParser, PoolsParser};
use crate::scraper::Browser;
use crate::storage::{RaceStore, RestStore, SqliteRepository};
use crate::types::{NormalizedRunnerUpdate, PoolTotals, RaceDescriptor};

#[derive(Parser)]
#[command(name = "racepools")]
#[command(version, about = "Sync today's race MTP and pari-mutuel pools into the race schedule", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape today's races once and update the store
    Run {
        /// Store backend override
        #[arg(short, long, value_enum)]
        store: Option<StoreBackend>,

        /// SQLite database path (sqlite backend)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Show the browser window
        #[arg(long)]
        headful: bool,

        /// Race date to match instead of today, in the store's date format
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Parse a saved listing page and print the races found
    InspectListing {
        /// Path to listing HTML snapshot
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Parse a saved race page and print MTP and normalized pools
    InspectPools {
        /// Path to race detail HTML snapshot
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

/// Run one scrape pass.
pub async fn run_scrape(
    store: Option<StoreBackend>,
    db: Option<PathBuf>,
    format: String,
    headful: bool,
    date: Option<String>,
) -> anyhow::Result<()> {
    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(backend) = store {
        config.store.backend = backend;
    }
    if let Some(path) = db {
        config.store.sqlite_path = path.to_string_lossy().to_string();
    }
    if headful {
        config.browser.headless = false;
    }

    let race_date = match date {
        Some(d) => {
            NaiveDate::parse_from_str(&d, &config.scrape.date_format).with_context(|| {
                format!("--date {} does not match {}", d, config.scrape.date_format)
            })?;
            d
        }
        None => Local::now().format(&config.scrape.date_format).to_string(),
    };

    let store: Box<dyn RaceStore> = match config.store.backend {
        StoreBackend::Rest => Box::new(RestStore::from_config(&config.store)?),
        StoreBackend::Sqlite => {
            tracing::info!("Using SQLite store at {}", config.store.sqlite_path);
            Box::new(SqliteRepository::new(Path::new(&config.store.sqlite_path))?)
        }
    };

    tracing::info!("Launching browser (headless: {})", config.browser.headless);
    let browser = Browser::launch(&config.browser).await?;

    let outcome = {
        let pipeline = Pipeline::new(
            &browser,
            store.as_ref(),
            &config.site.listing_url,
            &config.scrape,
            race_date,
        );
        match config.scrape.run_timeout() {
            Some(limit) => tokio::time::timeout(limit, pipeline.run())
                .await
                .map_err(|_| anyhow!("run exceeded the {:?} watchdog", limit))
                .and_then(|result| result.map_err(anyhow::Error::from)),
            None => pipeline.run().await.map_err(anyhow::Error::from),
        }
    };

    browser.close().await;

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Scrape run failed: {:#}", e);
            return Err(e);
        }
    };

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "table" => print_summary_table(&summary),
        _ => {
            eprintln!("Unknown format: {}. Using table.", format);
            print_summary_table(&summary);
        }
    }

    Ok(())
}

/// Parse a saved listing snapshot.
pub fn run_inspect_listing(input: PathBuf, format: String) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let races = ListingParser::parse(&html);
    eprintln!("Found {} races", races.len());

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&races)?),
        _ => print_listing_table(&races),
    }
    Ok(())
}

fn print_listing_table(races: &[RaceDescriptor]) {
    println!("  {:>3} {:28} {:>4} {:16}  {}", "#", "Track", "Race", "Row", "Raw text");
    println!("  {}", "-".repeat(80));
    for r in races {
        println!(
            "  {:>3} {:28} {:>4} {:16}  {}",
            r.ordinal_index,
            r.track_name_clean,
            r.race_number,
            r.element_ref.to_string(),
            r.track_name_raw
        );
    }
}

#[derive(Debug, Serialize)]
struct InspectedRunner {
    post_position: u32,
    #[serde(flatten)]
    update: NormalizedRunnerUpdate,
}

#[derive(Debug, Serialize)]
struct PoolsInspection {
    mtp: Option<u32>,
    totals: PoolTotals,
    runners: Vec<InspectedRunner>,
}

fn inspect_pools_html(html: &str) -> PoolsInspection {
    let snapshot = PoolsParser::parse(html);
    PoolsInspection {
        mtp: PoolsParser::parse_mtp(html),
        totals: snapshot.totals,
        runners: snapshot
            .runners
            .iter()
            .map(|row| InspectedRunner {
                post_position: row.post_position,
                update: normalize_runner_row(row),
            })
            .collect(),
    }
}

/// Parse a saved race detail snapshot.
pub fn run_inspect_pools(input: PathBuf, format: String) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let inspection = inspect_pools_html(&html);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&inspection)?),
        _ => print_pools_table(&inspection),
    }
    Ok(())
}

fn print_pools_table(inspection: &PoolsInspection) {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let num = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string());

    match inspection.mtp {
        Some(mtp) => println!("MTP: {}", mtp),
        None => println!("MTP: -"),
    }
    println!(
        "Totals: win {}  place {}  show {}",
        text(&inspection.totals.win),
        text(&inspection.totals.place),
        text(&inspection.totals.show)
    );
    println!();
    println!(
        "  {:>4} {:>8} {:>12} {:>12} {:>12}",
        "Post", "Odds", "Win", "Place", "Show"
    );
    println!("  {}", "-".repeat(52));
    for r in &inspection.runners {
        println!(
            "  {:>4} {:>8} {:>12} {:>12} {:>12}",
            r.post_position,
            num(r.update.decimal_odds),
            num(r.update.win),
            num(r.update.place),
            num(r.update.show)
        );
    }
}
