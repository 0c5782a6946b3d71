//! racepools
//!
//! Reads today's races from the wagering site listing, matches them to the
//! stored schedule, and refreshes minutes-to-post and win/place/show pools.

mod cli;
mod config;
mod error;
mod matcher;
mod normalize;
mod pipeline;
mod retry;
mod scraper;
mod storage;
mod types;
mod updater;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "racepools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            store,
            db,
            format,
            headful,
            date,
        } => cli::run_scrape(store, db, format, headful, date).await,
        Commands::InspectListing { input, format } => cli::run_inspect_listing(input, format),
        Commands::InspectPools { input, format } => cli::run_inspect_pools(input, format),
    }
}
