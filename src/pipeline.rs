//! One scrape run: listing, matching, then detail scraping and updates for
//! each matched race in listing order.

use serde::Serialize;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::error::RunError;
use crate::matcher::RaceMatcher;
use crate::retry::RetryConfig;
use crate::scraper::{BrowserDriver, DetailScraper, ListingScraper};
use crate::storage::RaceStore;
use crate::types::{MatchKind, MatchOutcome, PersistedRace, PoolTotals, RaceDescriptor};
use crate::updater::{PersistenceUpdater, RunnerTally, UpdateOutcome};

/// What happened to one matched race
#[derive(Debug, Clone, Serialize)]
pub struct RaceReport {
    pub track_name: String,
    pub race_number: u32,
    pub race_id: String,
    pub stored_track_name: String,
    pub match_kind: MatchKind,
    pub mtp: Option<u32>,
    pub mtp_update: UpdateOutcome,
    pub pool_totals: Option<PoolTotals>,
    pub runners: RunnerTally,
    /// Step failure that cut this race short
    pub error: Option<String>,
}

impl RaceReport {
    fn new(descriptor: &RaceDescriptor, race: &PersistedRace, kind: MatchKind) -> Self {
        Self {
            track_name: descriptor.track_name_clean.clone(),
            race_number: descriptor.race_number,
            race_id: race.race_id.clone(),
            stored_track_name: race.track_name.clone(),
            match_kind: kind,
            mtp: None,
            mtp_update: UpdateOutcome::Skipped,
            pool_totals: None,
            runners: RunnerTally::default(),
            error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Operator summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub race_date: String,
    pub scraped: usize,
    pub matched_exact: usize,
    pub matched_fuzzy: usize,
    pub unmatched: usize,
    pub races: Vec<RaceReport>,
    pub unmatched_races: Vec<String>,
    pub duration_secs: f64,
}

impl RunSummary {
    pub fn matched(&self) -> usize {
        self.matched_exact + self.matched_fuzzy
    }

    pub fn failed(&self) -> usize {
        self.races.iter().filter(|r| !r.passed()).count()
    }
}

/// Sequences the stages of one run against a browser and a store
pub struct Pipeline<'a> {
    browser: &'a dyn BrowserDriver,
    store: &'a dyn RaceStore,
    listing_url: &'a str,
    config: &'a ScrapeConfig,
    race_date: String,
    listing_retry: RetryConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        browser: &'a dyn BrowserDriver,
        store: &'a dyn RaceStore,
        listing_url: &'a str,
        config: &'a ScrapeConfig,
        race_date: String,
    ) -> Self {
        Self {
            browser,
            store,
            listing_url,
            config,
            race_date,
            listing_retry: RetryConfig::browser(),
        }
    }

    #[cfg(test)]
    pub fn with_listing_retry(mut self, retry: RetryConfig) -> Self {
        self.listing_retry = retry;
        self
    }

    /// Run once. Only setup failures are returned as errors; every per-race
    /// failure ends up in the summary.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        info!(date = %self.race_date, "starting scrape run");

        let descriptors = self.read_listing().await?;
        let scraped = descriptors.len();

        let matches = RaceMatcher::new(self.store, &self.race_date)
            .match_all(descriptors)
            .await;

        let mut summary = RunSummary {
            race_date: self.race_date.clone(),
            scraped,
            matched_exact: 0,
            matched_fuzzy: 0,
            unmatched: 0,
            races: Vec::new(),
            unmatched_races: Vec::new(),
            duration_secs: 0.0,
        };

        let scraper = DetailScraper::new(self.browser, self.listing_url, self.config);
        let updater = PersistenceUpdater::new(self.store);

        for result in matches {
            let (race, kind) = match result.outcome {
                MatchOutcome::Matched { race, kind } => (race, kind),
                MatchOutcome::Unmatched => {
                    summary.unmatched += 1;
                    summary.unmatched_races.push(result.descriptor.to_string());
                    continue;
                }
            };
            match kind {
                MatchKind::Exact => summary.matched_exact += 1,
                MatchKind::Fuzzy => summary.matched_fuzzy += 1,
            }

            if !summary.races.is_empty() {
                sleep(self.config.inter_race_pause()).await;
            }

            let report = self
                .process_race(&scraper, &updater, &result.descriptor, &race, kind)
                .await;
            summary.races.push(report);
        }

        summary.duration_secs = started.elapsed().as_secs_f64();
        info!(
            scraped = summary.scraped,
            exact = summary.matched_exact,
            fuzzy = summary.matched_fuzzy,
            unmatched = summary.unmatched,
            failed = summary.failed(),
            "scrape run complete"
        );
        Ok(summary)
    }

    async fn read_listing(&self) -> Result<Vec<RaceDescriptor>, RunError> {
        let page = self.browser.new_page().await?;
        let result = ListingScraper::new(self.listing_url, self.config)
            .with_retry(self.listing_retry.clone())
            .scrape(page.as_ref())
            .await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "failed to close listing page");
        }
        result
    }

    async fn process_race(
        &self,
        scraper: &DetailScraper<'_>,
        updater: &PersistenceUpdater<'_>,
        descriptor: &RaceDescriptor,
        race: &PersistedRace,
        kind: MatchKind,
    ) -> RaceReport {
        let mut report = RaceReport::new(descriptor, race, kind);
        info!(race = %descriptor, race_id = %race.race_id, kind = ?kind, "scraping race");

        let detail = match scraper.scrape(descriptor).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(race = %descriptor, race_id = %race.race_id, error = %e, "failed to reach race page");
                report.error = Some(e.to_string());
                return report;
            }
        };

        report.mtp = detail.mtp;
        report.mtp_update = updater
            .update_race_time_to_post(&race.race_id, detail.mtp)
            .await;

        match detail.pools {
            Ok(snapshot) => {
                report.runners = updater
                    .update_all_runners(&race.race_id, &snapshot.runners)
                    .await;
                report.pool_totals = Some(snapshot.totals);
            }
            Err(e) => {
                warn!(race = %descriptor, race_id = %race.race_id, error = %e, "failed to read pools");
                report.error = Some(format!("pools: {}", e));
            }
        }

        report
    }
}

fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Exact => "exact",
        MatchKind::Fuzzy => "FUZZY",
    }
}

/// Print a run summary as text
pub fn print_summary_table(summary: &RunSummary) {
    println!("=== Scrape Run {} ===", summary.race_date);
    println!();
    println!("  Scraped:        {}", summary.scraped);
    println!("  Matched:        {}", summary.matched());
    println!("    exact:        {}", summary.matched_exact);
    println!("    fuzzy:        {}", summary.matched_fuzzy);
    println!("  Unmatched:      {}", summary.unmatched);
    println!("  Failed races:   {}", summary.failed());
    println!("  Duration:       {:.1}s", summary.duration_secs);
    println!();

    if !summary.races.is_empty() {
        println!("Races:");
        println!(
            "  {:28} {:>4} {:6} {:>4} {:>8} {:>8} {:>8}  {}",
            "Track", "Race", "Match", "MTP", "Updated", "Skipped", "Failed", "Note"
        );
        println!("  {}", "-".repeat(88));
        for r in &summary.races {
            let mtp = r.mtp.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string());
            let note = match (&r.error, r.match_kind) {
                (Some(e), _) => e.clone(),
                (None, MatchKind::Fuzzy) => format!("matched {}", r.stored_track_name),
                (None, MatchKind::Exact) => String::new(),
            };
            println!(
                "  {:28} {:>4} {:6} {:>4} {:>8} {:>8} {:>8}  {}",
                r.track_name,
                r.race_number,
                kind_label(r.match_kind),
                mtp,
                r.runners.updated,
                r.runners.skipped,
                r.runners.failed,
                note
            );
        }
        println!();
    }

    if !summary.unmatched_races.is_empty() {
        println!("Unmatched:");
        for name in &summary.unmatched_races {
            println!("  {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::fixtures::{self, TODAY};
    use crate::storage::repository::tests::race;
    use crate::storage::SqliteRepository;
    use std::time::Duration;

    const URL: &str = "https://example.test/races";

    fn seeded() -> SqliteRepository {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("GP-3", "Gulfstream Park", 3, TODAY))
            .unwrap();
        repo.insert_race(&race("AQU-5", "Aqueduct Racetrack", 5, TODAY))
            .unwrap();
        repo.insert_runner("gp-1", "GP-3", 1).unwrap();
        repo.insert_runner("gp-2", "GP-3", 2).unwrap();
        repo.insert_runner("aqu-1", "AQU-5", 1).unwrap();
        repo
    }

    #[tokio::test]
    async fn test_end_to_end_exact_and_fuzzy() {
        let site = fixtures::site();
        let repo = seeded();
        let config = ScrapeConfig::instant();

        let summary = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.scraped, 2);
        assert_eq!(summary.matched_exact, 1);
        assert_eq!(summary.matched_fuzzy, 1);
        assert_eq!(summary.unmatched, 0);
        assert_eq!(summary.failed(), 0);

        assert_eq!(summary.races[0].race_id, "GP-3");
        assert_eq!(summary.races[0].match_kind, MatchKind::Exact);
        assert_eq!(summary.races[1].race_id, "AQU-5");
        assert_eq!(summary.races[1].match_kind, MatchKind::Fuzzy);
        assert_eq!(
            summary.races[1].runners,
            RunnerTally {
                updated: 1,
                skipped: 1,
                failed: 0
            }
        );

        assert_eq!(repo.race_mtp("GP-3").unwrap(), Some(7));
        assert_eq!(repo.race_mtp("AQU-5").unwrap(), Some(12));
        assert_eq!(
            repo.runner_pools("gp-1").unwrap(),
            (Some(1.11), Some(13686.0), Some(5120.0), Some(2004.0))
        );
        assert_eq!(
            repo.runner_pools("gp-2").unwrap(),
            (Some(16.0), Some(1002.0), None, None)
        );

        assert_eq!(site.visits(), vec!["race-GP-3", "race-AQU-5"]);
        assert_eq!(site.pages_opened(), 3);
        assert_eq!(site.pages_closed(), 3);
    }

    #[tokio::test]
    async fn test_failed_race_does_not_stop_the_run() {
        let site = fixtures::site().with_broken_row("race-GP-3");
        let repo = seeded();
        let config = ScrapeConfig::instant();

        let summary = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.matched(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.races[0].passed());
        assert!(summary.races[1].passed());
        assert_eq!(repo.race_mtp("GP-3").unwrap(), None);
        assert_eq!(repo.race_mtp("AQU-5").unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_unmatched_races_are_not_visited() {
        let site = fixtures::site();
        let repo = SqliteRepository::in_memory().unwrap();
        let config = ScrapeConfig::instant();

        let summary = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.unmatched, 2);
        assert_eq!(
            summary.unmatched_races,
            vec!["Gulfstream Park - Race 3", "Aqueduct - Race 5"]
        );
        assert!(summary.races.is_empty());
        assert!(site.visits().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_fatal() {
        let site = fixtures::site().with_failing_listing_loads(10);
        let repo = seeded();
        let config = ScrapeConfig::instant();

        let result = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .with_listing_retry(RetryConfig::none())
            .run()
            .await;

        assert!(matches!(result, Err(RunError::ListingUnavailable(_))));
        assert_eq!(site.pages_opened(), site.pages_closed());
    }

    fn paced() -> ScrapeConfig {
        ScrapeConfig {
            inter_race_pause_ms: 2000,
            ..ScrapeConfig::instant()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_between_races_only() {
        let site = fixtures::site();
        let repo = seeded();
        let config = paced();

        let started = tokio::time::Instant::now();
        let summary = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.races.len(), 2);
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_race_is_not_paused() {
        let site = fixtures::site();
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("GP-3", "Gulfstream Park", 3, TODAY))
            .unwrap();
        let config = paced();

        let started = tokio::time::Instant::now();
        let summary = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.races.len(), 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_summary_json() {
        let site = fixtures::site();
        let repo = seeded();
        let config = ScrapeConfig::instant();

        let summary = Pipeline::new(&site, &repo, URL, &config, TODAY.to_string())
            .run()
            .await
            .unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["matched_fuzzy"], 1);
        assert_eq!(json["races"][1]["match_kind"], "fuzzy");
        assert_eq!(json["races"][0]["mtp_update"], "updated");
        assert_eq!(json["races"][0]["pool_totals"]["win"], "$41,210");
    }
}
