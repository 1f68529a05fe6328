use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Search results for owner-occupied flats in Vienna
pub const DEFAULT_BASE_URL: &str = "https://www.willhaben.at/iad/immobilien/eigentumswohnung/wien";

/// Class name carried by every rendered listing card. Site-specific and
/// changes whenever the site ships a new build.
pub const DEFAULT_CONTENT_MARKER: &str = "hPOcQO";

pub const DEFAULT_LAST_PAGE: u32 = 100;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to scrape and how far
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_content_marker")]
    pub content_marker: String,

    #[serde(default = "default_last_page")]
    pub last_page: u32,

    /// Timeouts tolerated on a single page before the run is aborted
    #[serde(default = "default_max_page_retries")]
    pub max_page_retries: u32,
}

/// Options handed to the browser-backed page fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_true")]
    pub suppress_images: bool,

    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,

    #[serde(default = "default_script_timeout_secs")]
    pub script_timeout_secs: u64,

    #[serde(default = "default_content_wait_timeout_secs")]
    pub content_wait_timeout_secs: u64,

    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: u32,

    #[serde(default = "default_scroll_count")]
    pub scroll_count: u32,

    #[serde(default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,
}

/// Where files land
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_progress_file")]
    pub progress_file: PathBuf,

    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,

    /// When set, the HTML of every loaded page is saved here
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

impl BrowserConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }

    pub fn content_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.content_wait_timeout_secs)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_content_marker() -> String {
    DEFAULT_CONTENT_MARKER.to_string()
}
fn default_last_page() -> u32 {
    DEFAULT_LAST_PAGE
}
fn default_max_page_retries() -> u32 {
    10
}
fn default_true() -> bool {
    true
}
fn default_page_load_timeout_secs() -> u64 {
    500
}
fn default_script_timeout_secs() -> u64 {
    500
}
fn default_content_wait_timeout_secs() -> u64 {
    30
}
fn default_scroll_step_px() -> u32 {
    500
}
fn default_scroll_count() -> u32 {
    30
}
fn default_scroll_pause_ms() -> u64 {
    500
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_progress_file() -> PathBuf {
    PathBuf::from("progress.txt")
}
fn default_snapshot_file() -> PathBuf {
    PathBuf::from("scraped_properties_temp.csv")
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            content_marker: default_content_marker(),
            last_page: default_last_page(),
            max_page_retries: default_max_page_retries(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            suppress_images: true,
            page_load_timeout_secs: default_page_load_timeout_secs(),
            script_timeout_secs: default_script_timeout_secs(),
            content_wait_timeout_secs: default_content_wait_timeout_secs(),
            scroll_step_px: default_scroll_step_px(),
            scroll_count: default_scroll_count(),
            scroll_pause_ms: default_scroll_pause_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            progress_file: default_progress_file(),
            snapshot_file: default_snapshot_file(),
            debug_dir: None,
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from `config/default.toml`, `config/local.toml`
    /// and `FLAT_SCOUT__*` environment overrides, in that order.
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("FLAT_SCOUT").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_site_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scraper.last_page, 100);
        assert_eq!(cfg.scraper.content_marker, "hPOcQO");
        assert!(cfg.browser.headless);
        assert_eq!(cfg.browser.scroll_count, 30);
        assert_eq!(cfg.browser.scroll_pause(), Duration::from_millis(500));
        assert_eq!(cfg.output.progress_file, PathBuf::from("progress.txt"));
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[scraper]\nlast_page = 3\n\n[browser]\nheadless = false\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.scraper.last_page, 3);
        assert_eq!(cfg.scraper.base_url, DEFAULT_BASE_URL);
        assert!(!cfg.browser.headless);
        assert!(cfg.browser.suppress_images);
        assert_eq!(cfg.output.snapshot_file, PathBuf::from("scraped_properties_temp.csv"));
    }
}
