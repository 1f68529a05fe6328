//! Turn a scraped listings CSV into numeric data ready for analysis.
//!
//! Drops incomplete rows and duplicate listings, converts size and price to
//! integers, trims outliers outside the 2nd–98th percentile of both, and
//! adds `Price/m2`.

use crate::models::CleanedListing;
use crate::storage::dataset::write_csv;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CLEANED_FILE: &str = "cleaned_properties_with_price_per_m2.csv";

const LOWER_QUANTILE: f64 = 0.02;
const UPPER_QUANTILE: f64 = 0.98;

/// Row counts at each cleaning step
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanReport {
    pub rows_read: usize,
    pub malformed: usize,
    pub incomplete: usize,
    pub duplicates: usize,
    pub outliers: usize,
    pub kept: usize,
}

/// Clean `input` and write the result to `output`
pub fn clean_file(input: &Path, output: &Path) -> Result<CleanReport> {
    let delimiter = detect_delimiter(input)?;
    debug!("Reading {} with delimiter {:?}", input.display(), delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        match headers.iter().position(|h| h.trim() == name) {
            Some(idx) => Ok(idx),
            None => bail!("{} has no {:?} column", input.display(), name),
        }
    };
    let columns = Columns {
        title: column("Title").ok(),
        postcode: column("Postcode")?,
        size: column("Size")?,
        price: column("Price")?,
        url: column("URL").ok(),
    };

    let mut report = CleanReport::default();
    let mut rows = Vec::new();

    for (i, result) in reader.records().enumerate() {
        report.rows_read += 1;
        let record = match result {
            // Short rows are padded with empty cells; only surplus fields are malformed
            Ok(r) if r.len() <= headers.len() => r,
            Ok(r) => {
                warn!("Row {}: expected {} fields, found {}", i + 1, headers.len(), r.len());
                report.malformed += 1;
                continue;
            }
            Err(e) => {
                warn!("Row {}: {}", i + 1, e);
                report.malformed += 1;
                continue;
            }
        };

        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        rows.push(RawRow {
            title: field(columns.title),
            postcode: field(Some(columns.postcode)),
            size: field(Some(columns.size)),
            price: field(Some(columns.price)),
            url: field(columns.url),
        });
    }

    let listings = clean_rows(rows, &mut report);
    write_csv(
        output,
        &["Title", "Postcode", "Size", "Price", "URL", "Price/m2"],
        &listings,
    )?;

    info!(
        "🧹 {} of {} rows kept ({} incomplete, {} duplicates, {} outliers, {} malformed) → {}",
        report.kept,
        report.rows_read,
        report.incomplete,
        report.duplicates,
        report.outliers,
        report.malformed,
        output.display()
    );

    Ok(report)
}

struct Columns {
    title: Option<usize>,
    postcode: usize,
    size: usize,
    price: usize,
    url: Option<usize>,
}

/// One row as read, all fields trimmed, empty meaning missing
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub title: String,
    pub postcode: String,
    pub size: String,
    pub price: String,
    pub url: String,
}

/// Numeric conversion, dedup, outlier trim and `Price/m2`
pub fn clean_rows(rows: Vec<RawRow>, report: &mut CleanReport) -> Vec<CleanedListing> {
    let mut seen_urls = HashSet::new();
    let mut listings = Vec::new();

    for row in rows {
        if row.postcode.is_empty() || row.size.is_empty() || row.price.is_empty() {
            report.incomplete += 1;
            continue;
        }

        let (Some(size_m2), Some(price)) = (parse_size(&row.size), parse_price(&row.price)) else {
            report.incomplete += 1;
            continue;
        };
        if size_m2 == 0 {
            report.incomplete += 1;
            continue;
        }

        if !row.url.is_empty() && !seen_urls.insert(row.url.clone()) {
            report.duplicates += 1;
            continue;
        }

        listings.push(CleanedListing {
            title: row.title,
            postcode: row.postcode,
            size_m2,
            price,
            url: row.url,
            price_per_m2: price as f64 / f64::from(size_m2),
        });
    }

    let sizes: Vec<f64> = listings.iter().map(|l| f64::from(l.size_m2)).collect();
    let prices: Vec<f64> = listings.iter().map(|l| l.price as f64).collect();

    if let (Some((size_lo, size_hi)), Some((price_lo, price_hi))) =
        (bounds(&sizes), bounds(&prices))
    {
        let before = listings.len();
        listings.retain(|l| {
            let size = f64::from(l.size_m2);
            let price = l.price as f64;
            (size_lo..=size_hi).contains(&size) && (price_lo..=price_hi).contains(&price)
        });
        report.outliers += before - listings.len();
    }

    report.kept = listings.len();
    listings
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    Some((quantile(values, LOWER_QUANTILE)?, quantile(values, UPPER_QUANTILE)?))
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// "85 m²" → 85. Digits only, anything else is noise.
pub fn parse_size(s: &str) -> Option<u32> {
    digits(s).parse().ok()
}

/// "€ 450.000" → 450000, "€ 1.234,56" → 1234. A trailing comma part is
/// the cents and is dropped before the separators are stripped.
pub fn parse_price(s: &str) -> Option<u64> {
    let s = s.trim();
    let whole = match s.rsplit_once(',') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => s,
    };
    digits(whole).parse().ok()
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// `,` if the header line has one, else `;`, else tab
fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line)?;

    Ok(if first_line.contains(',') {
        b','
    } else if first_line.contains(';') {
        b';'
    } else {
        b'\t'
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn row(size: &str, price: &str, url: &str) -> RawRow {
        RawRow {
            title: "Wohnung".into(),
            postcode: "1010".into(),
            size: size.into(),
            price: price.into(),
            url: url.into(),
        }
    }

    #[test]
    fn size_and_price_become_integers() {
        assert_eq!(parse_size("85 m²"), Some(85));
        assert_eq!(parse_size("m²"), None);
        assert_eq!(parse_price("€ 450.000"), Some(450_000));
        assert_eq!(parse_price("€ 1.234,56"), Some(1234));
        assert_eq!(parse_price("€ 1.234,"), Some(1234));
        assert_eq!(parse_price("€"), None);
    }

    #[test]
    fn quantile_interpolates_like_pandas() {
        let values: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_eq!(quantile(&values, 0.5), Some(3.0));
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(5.0));
        assert!((quantile(&values, 0.02).unwrap() - 1.08).abs() < 1e-9);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn incomplete_and_duplicate_rows_are_dropped() {
        let mut report = CleanReport::default();
        let rows = vec![
            row("80 m²", "€ 400.000", "a"),
            row("", "€ 400.000", "b"),
            row("80 m²", "", "c"),
            RawRow { postcode: String::new(), ..row("80 m²", "€ 400.000", "d") },
            row("0 m²", "€ 400.000", "e"),
            row("80 m²", "€ 400.000", "a"),
        ];

        let listings = clean_rows(rows, &mut report);

        assert_eq!(listings.len(), 1);
        assert_eq!(report.incomplete, 4);
        assert_eq!(report.duplicates, 1);
        assert_eq!(listings[0].price_per_m2, 5000.0);
    }

    #[test]
    fn extremes_are_trimmed() {
        let mut rows: Vec<RawRow> = (0..50)
            .map(|i| {
                let size = format!("{} m²", 60 + i);
                let price = format!("€ {}.000", 300 + i);
                row(&size, &price, &format!("u{}", i))
            })
            .collect();
        rows.push(row("5 m²", "€ 320.000", "tiny"));
        rows.push(row("70 m²", "€ 99.000.000", "palace"));

        let mut report = CleanReport::default();
        let listings = clean_rows(rows, &mut report);

        assert!(listings.iter().all(|l| l.url != "tiny" && l.url != "palace"));
        assert!(report.outliers >= 2);
        assert_eq!(report.kept, listings.len());
    }

    #[test]
    fn cleans_semicolon_file_end_to_end() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("scraped.csv");
        let output = dir.path().join(DEFAULT_CLEANED_FILE);
        fs::write(
            &input,
            "Title;Postcode;Size;Price;URL\n\
             Nice Flat;1010;85 m²;€ 425.000;https://x.at/1\n\
             Broken;1020;60 m²;€ 1;https://x.at/2;extra\n\
             No Price;1030;50 m²;;https://x.at/3\n\
             No Link;1040;85 m²;€ 425.000\n",
        )
        .unwrap();

        let report = clean_file(&input, &output).unwrap();

        assert_eq!(report.rows_read, 4);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.incomplete, 1);
        assert_eq!(report.kept, 2);

        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            concat!(
                "Title,Postcode,Size,Price,URL,Price/m2\n",
                "Nice Flat,1010,85,425000,https://x.at/1,5000.0\n",
                "No Link,1040,85,425000,,5000.0\n",
            )
        );
    }

    #[test]
    fn missing_price_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bad.csv");
        fs::write(&input, "Title,Postcode,Size\nA,1010,80 m²\n").unwrap();

        assert!(clean_file(&input, &dir.path().join("out.csv")).is_err());
    }
}
