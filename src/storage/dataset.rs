use crate::models::{ParsedListing, ScrapedRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sink for the raw snapshot and the final parsed dataset
pub trait DatasetWriter {
    /// Overwrite the temp snapshot with every record collected so far.
    /// An empty collection leaves an existing snapshot untouched.
    fn write_snapshot(&mut self, records: &[ScrapedRecord]) -> Result<PathBuf>;

    /// Write the parsed listings of pages `first..=last`, scraped on `date`
    fn write_final(
        &mut self,
        listings: &[ParsedListing],
        first: u32,
        last: u32,
        date: NaiveDate,
    ) -> Result<PathBuf>;
}

/// `scraped_properties_pages_<first>_to_<last>_<YYYY-MM-DD>.csv`
pub fn final_file_name(first: u32, last: u32, date: NaiveDate) -> String {
    format!(
        "scraped_properties_pages_{}_to_{}_{}.csv",
        first,
        last,
        date.format("%Y-%m-%d")
    )
}

/// CSV files in one output directory
pub struct CsvDatasetWriter {
    dir: PathBuf,
    snapshot_file: PathBuf,
}

impl CsvDatasetWriter {
    pub fn new(dir: impl Into<PathBuf>, snapshot_file: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            snapshot_file: snapshot_file.into(),
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.snapshot_file)
    }
}

impl DatasetWriter for CsvDatasetWriter {
    fn write_snapshot(&mut self, records: &[ScrapedRecord]) -> Result<PathBuf> {
        let path = self.snapshot_path();
        if records.is_empty() && path.exists() {
            info!("Nothing collected, keeping previous snapshot {}", path.display());
            return Ok(path);
        }
        write_csv(&path, &["text", "url"], records)?;
        info!("💾 Saved {} raw records to {}", records.len(), path.display());
        Ok(path)
    }

    fn write_final(
        &mut self,
        listings: &[ParsedListing],
        first: u32,
        last: u32,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let path = self.dir.join(final_file_name(first, last, date));
        write_csv(&path, &["Title", "Postcode", "Size", "Price", "URL"], listings)?;
        info!("💾 Saved {} listings to {}", listings.len(), path.display());
        Ok(path)
    }
}

/// Header first, even for an empty dataset, then one row per item
pub(crate) fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
