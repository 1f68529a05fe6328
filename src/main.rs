mod cleaning;
mod config;
mod models;
mod parser;
mod pipeline;
mod scrapers;
mod storage;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::models::ScrapedRecord;
use crate::pipeline::{Pipeline, RunSettings};
use crate::scrapers::{extract, ChromeFetcher, HtmlPage};
use crate::storage::dataset::write_csv;
use crate::storage::{CsvDatasetWriter, ProgressStore};

#[derive(Parser)]
#[command(name = "flat-scout", about = "Vienna flat listings scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape result pages, resuming where the last run stopped
    Scrape {
        /// Start at this page instead of the saved progress marker
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        from_page: Option<u32>,

        /// Last page to scrape (default from config: 100)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        to_page: Option<u32>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },

    /// Clean a scraped listings CSV and add Price/m2
    Clean {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = cleaning::DEFAULT_CLEANED_FILE)]
        output: PathBuf,
    },

    /// Parse listings out of saved page HTML (see `output.debug_dir`)
    Extract {
        #[arg(required = true)]
        html: Vec<PathBuf>,

        #[arg(short, long, default_value = "extracted_properties.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "flat_scout=info,warn",
        1 => "flat_scout=debug,info",
        _ => "trace",
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape {
            from_page,
            to_page,
            headed,
        } => scrape(config, from_page, to_page, headed).await,

        Command::Clean { input, output } => {
            cleaning::clean_file(&input, &output)?;
            Ok(())
        }

        Command::Extract { html, output } => {
            let mut records: Vec<ScrapedRecord> = Vec::new();
            for path in &html {
                let page = HtmlPage::from_file(path)?;
                let found = extract(&page, &config.scraper.content_marker)?;
                info!("{}: {} listings", path.display(), found.len());
                records.extend(found);
            }

            let listings = parser::parse_all(&records);
            write_csv(&output, &["Title", "Postcode", "Size", "Price", "URL"], &listings)?;
            info!("💾 Saved {} listings to {}", listings.len(), output.display());
            Ok(())
        }
    }
}

async fn scrape(
    mut config: AppConfig,
    from_page: Option<u32>,
    to_page: Option<u32>,
    headed: bool,
) -> Result<()> {
    info!("🏠 Flat Scout - willhaben browser scraper");
    info!("==========================================");

    if headed {
        config.browser.headless = false;
    }

    let mut settings = RunSettings::from_config(&config);
    settings.from_page = from_page;
    if let Some(last) = to_page {
        settings.last_page = last;
    }

    // Ctrl-C ends the run after the current page, with data flushed
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current page...");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    // The browser session lives and dies inside this blocking task
    let report = tokio::task::spawn_blocking(move || {
        let fetcher = ChromeFetcher::new(
            config.browser.clone(),
            &config.scraper.base_url,
            &config.scraper.content_marker,
        )?
        .with_debug_dir(config.output.debug_dir.clone());

        let writer = CsvDatasetWriter::new(&config.output.dir, &config.output.snapshot_file);
        let progress = ProgressStore::new(config.output.dir.join(&config.output.progress_file));

        Pipeline::new(fetcher, writer, progress, settings)
            .with_stop_flag(stop)
            .run(Local::now().date_naive())
    })
    .await
    .context("Scrape task panicked")??;

    info!(
        "✅ Scraped {} records from {} pages ({} timeouts)",
        report.records,
        report.pages_done(),
        report.timeouts
    );

    match (report.failure, report.output) {
        (Some(failure), _) => Err(failure.context(format!(
            "Scrape ended early, partial data saved to {}",
            report.snapshot.display()
        ))),
        (None, Some(output)) => {
            info!("Scraping complete. Data saved to '{}'.", output.display());
            Ok(())
        }
        (None, None) => {
            info!("Nothing new to scrape. Raw snapshot at '{}'.", report.snapshot.display());
            Ok(())
        }
    }
}
