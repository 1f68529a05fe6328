use serde::Serialize;

/// Raw unit collected from one listing card on a results page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedRecord {
    pub text: String,
    pub url: String,
}

/// Listing fields recovered from a scraped record's text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedListing {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Postcode")]
    pub postcode: Option<String>,
    #[serde(rename = "Size")]
    pub size: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Listing with numeric size/price, ready for analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedListing {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Postcode")]
    pub postcode: String,
    #[serde(rename = "Size")]
    pub size_m2: u32,
    #[serde(rename = "Price")]
    pub price: u64,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Price/m2")]
    pub price_per_m2: f64,
}
