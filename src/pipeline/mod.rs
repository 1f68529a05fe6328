//! Scrape driver: resume → fetch/extract per page → flush → parse → final file.
//!
//! ## Page loop
//!
//! 1. Read the progress marker (or take the `--from-page` override).
//! 2. For each page up to the bound: fetch, extract, append, then move the
//!    marker to that page. A timeout re-fetches the same page and leaves the
//!    marker alone.
//! 3. Any other fault, or an interrupt, ends the loop early.
//!
//! However the loop ends, the raw records are flushed to the snapshot
//! exactly once. Only a loop that ran to the page bound goes on to parse
//! the records and write the dated final file.

use crate::config::AppConfig;
use crate::models::ScrapedRecord;
use crate::parser::parse_all;
use crate::scrapers::{extract, PageFetcher};
use crate::storage::{DatasetWriter, ProgressStore};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Knobs of a single run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Start here instead of at the progress marker
    pub from_page: Option<u32>,
    /// Last page to scrape, inclusive
    pub last_page: u32,
    pub content_marker: String,
    pub max_page_retries: u32,
}

impl RunSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            from_page: None,
            last_page: config.scraper.last_page,
            content_marker: config.scraper.content_marker.clone(),
            max_page_retries: config.scraper.max_page_retries,
        }
    }
}

/// What a run produced
#[derive(Debug)]
pub struct RunReport {
    pub first_page: u32,
    /// Last page whose listings were collected, if any
    pub last_page_done: Option<u32>,
    pub records: usize,
    pub timeouts: u32,
    pub snapshot: PathBuf,
    /// Dated final file, written only when the loop completed
    pub output: Option<PathBuf>,
    /// Fault that ended the loop early
    pub failure: Option<anyhow::Error>,
}

impl RunReport {
    pub fn pages_done(&self) -> u32 {
        self.last_page_done
            .map(|last| last + 1 - self.first_page)
            .unwrap_or(0)
    }
}

/// State carried through the page loop
#[derive(Default)]
struct Collected {
    records: Vec<ScrapedRecord>,
    last_page_done: Option<u32>,
    timeouts: u32,
}

pub struct Pipeline<F, W> {
    fetcher: F,
    writer: W,
    progress: ProgressStore,
    settings: RunSettings,
    stop: Arc<AtomicBool>,
}

impl<F: PageFetcher, W: DatasetWriter> Pipeline<F, W> {
    pub fn new(fetcher: F, writer: W, progress: ProgressStore, settings: RunSettings) -> Self {
        Self {
            fetcher,
            writer,
            progress,
            settings,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before every page; setting it ends the run like a fault
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Run the scrape. `Err` means the collected data could not be saved;
    /// a fault during scraping is reported through `RunReport::failure`.
    pub fn run(&mut self, today: NaiveDate) -> Result<RunReport> {
        let first_page = match self.settings.from_page {
            Some(page) => page,
            None => self.progress.read(),
        };
        info!(
            "Resuming from page {} (source: {}, bound: {})...",
            first_page,
            self.fetcher.source_name(),
            self.settings.last_page
        );

        let mut collected = Collected::default();
        let failure = self.scrape_pages(first_page, &mut collected).err();

        if let Some(e) = &failure {
            error!("Stopping early: {:#}", e);
        }

        // Flush whatever we have, fault or not
        let snapshot = self
            .writer
            .write_snapshot(&collected.records)
            .context("Failed to save scraped records")?;

        let mut report = RunReport {
            first_page,
            last_page_done: collected.last_page_done,
            records: collected.records.len(),
            timeouts: collected.timeouts,
            snapshot,
            output: None,
            failure,
        };

        if report.failure.is_some() {
            return Ok(report);
        }

        let Some(last_page) = collected.last_page_done else {
            warn!(
                "No pages between {} and {} were scraped, skipping final file",
                first_page, self.settings.last_page
            );
            return Ok(report);
        };

        let listings = parse_all(&collected.records);
        let output = self
            .writer
            .write_final(&listings, first_page, last_page, today)
            .context("Failed to save parsed listings")?;
        report.output = Some(output);

        Ok(report)
    }

    fn scrape_pages(&mut self, first_page: u32, collected: &mut Collected) -> Result<()> {
        let mut page = first_page;
        let mut attempts = 0u32;

        while page <= self.settings.last_page {
            if self.stop.load(Ordering::SeqCst) {
                bail!("Interrupted before page {}", page);
            }

            info!("Scraping page {}...", page);
            let rendered = match self.fetcher.fetch(page) {
                Ok(rendered) => rendered,
                Err(e) if e.is_retryable() => {
                    collected.timeouts += 1;
                    attempts += 1;
                    if attempts > self.settings.max_page_retries {
                        return Err(anyhow::Error::new(e)).with_context(|| {
                            format!("Giving up on page {} after {} timeouts", page, attempts)
                        });
                    }
                    warn!(
                        "Timeout on page {}. Retrying ({}/{})...",
                        page, attempts, self.settings.max_page_retries
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let found = extract(&rendered, &self.settings.content_marker)
                .with_context(|| format!("Failed to extract listings from page {}", page))?;
            let count = found.len();
            collected.records.extend(found);

            self.progress.write(page)?;
            collected.last_page_done = Some(page);
            info!("Page {}: {} listings ({} total)", page, count, collected.records.len());

            attempts = 0;
            page += 1;
        }

        Ok(())
    }
}
