//! Field extraction from raw listing card text.
//!
//! Every pattern is an unanchored search over the whole card text. A title
//! such as "Erstbezug 2024" therefore yields postcode "2024" when it comes
//! before the address line; callers get exactly what the text says.

use crate::models::{ParsedListing, ScrapedRecord};
use regex::Regex;
use std::sync::OnceLock;

fn postcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4}\b").expect("valid postcode regex"))
}

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\s*m²").expect("valid size regex"))
}

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"€\s[\d.,]+").expect("valid price regex"))
}

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().to_string())
}

/// Recover title, postcode, size and price from one scraped record
pub fn parse(record: &ScrapedRecord) -> ParsedListing {
    let text = record.text.as_str();

    ParsedListing {
        title: text.lines().next().unwrap_or_default().to_string(),
        postcode: first_match(postcode_re(), text),
        size: first_match(size_re(), text),
        price: first_match(price_re(), text),
        url: record.url.clone(),
    }
}

pub fn parse_all(records: &[ScrapedRecord]) -> Vec<ParsedListing> {
    records.iter().map(parse).collect()
}
