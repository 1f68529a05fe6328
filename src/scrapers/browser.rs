use crate::config::BrowserConfig;
use crate::scrapers::traits::{FetchError, PageFetcher, RenderedPage};
use crate::scrapers::types::{marker_selector, page_url, PageElement};
use anyhow::{Context, Result};
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Browser-based page fetcher using headless Chrome.
///
/// Owns the whole browser session; dropping the fetcher terminates Chrome,
/// so every exit path of a run releases the browser process.
pub struct ChromeFetcher {
    // Field order matters: the tab must go before the browser.
    tab: Arc<Tab>,
    _browser: Browser,
    config: BrowserConfig,
    base_url: String,
    marker: String,
    debug_dir: Option<PathBuf>,
}

impl ChromeFetcher {
    /// Launch Chrome and open the tab all pages are loaded in
    pub fn new(config: BrowserConfig, base_url: &str, marker: &str) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", config.headless);

        let mut args: Vec<&OsStr> = vec![OsStr::new("--log-level=3")];
        if config.suppress_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        // Chrome has no per-script deadline over CDP; the closest thing is how
        // long the connection may stay silent before it counts as dead.
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .idle_browser_timeout(config.script_timeout())
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;
        tab.set_default_timeout(config.page_load_timeout());

        Ok(Self {
            tab,
            _browser: browser,
            config,
            base_url: base_url.to_string(),
            marker: marker.to_string(),
            debug_dir: None,
        })
    }

    /// Save the HTML of every loaded page into `dir`
    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    fn load(&self, page: u32) -> Result<()> {
        let url = page_url(&self.base_url, page);
        debug!("Navigating to {}", url);

        self.tab.navigate_to(&url)?;
        self.tab.wait_until_navigated()?;

        // Listing cards are rendered lazily as they scroll into view
        for i in 0..self.config.scroll_count {
            let y = u64::from(i) * u64::from(self.config.scroll_step_px);
            self.tab.evaluate(&format!("window.scrollTo(0, {});", y), false)?;
            thread::sleep(self.config.scroll_pause());
        }

        self.tab.wait_for_element_with_custom_timeout(
            &marker_selector(&self.marker),
            self.config.content_wait_timeout(),
        )?;

        if let Some(dir) = &self.debug_dir {
            self.dump_html(dir, page)?;
        }

        Ok(())
    }

    fn dump_html(&self, dir: &Path, page: u32) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let html = self.tab.evaluate("document.documentElement.outerHTML", false)?;
        if let Some(html_str) = html.value.as_ref().and_then(|v| v.as_str()) {
            let path = dir.join(format!("page_{}.html", page));
            std::fs::write(&path, html_str)?;
            debug!("Saved page HTML to {} ({} bytes)", path.display(), html_str.len());
        }
        Ok(())
    }
}

impl PageFetcher for ChromeFetcher {
    type Page = LivePage;

    fn fetch(&mut self, page: u32) -> Result<LivePage, FetchError> {
        match self.load(page) {
            Ok(()) => Ok(LivePage {
                tab: Arc::clone(&self.tab),
            }),
            Err(e) if is_timeout(&e) => {
                debug!("Page {} timed out: {:#}", page, e);
                Err(FetchError::Timeout { page })
            }
            Err(cause) => Err(FetchError::Driver { page, cause }),
        }
    }

    fn source_name(&self) -> &'static str {
        "willhaben"
    }
}

impl Drop for ChromeFetcher {
    fn drop(&mut self) {
        info!("Closing browser session");
        if let Err(e) = self.tab.close(true) {
            warn!("Failed to close tab cleanly: {:#}", e);
        }
    }
}

/// Timeouts surface as `util::Timeout`, or as `NoElementFound` once the
/// content wait gives up on the selector.
fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Timeout>() || cause.is::<NoElementFound>())
}

/// The page currently loaded in the fetcher's tab
pub struct LivePage {
    tab: Arc<Tab>,
}

impl RenderedPage for LivePage {
    fn find_by_marker(&self, marker: &str) -> Result<Vec<PageElement>> {
        let found = match self.tab.find_elements(&marker_selector(marker)) {
            Ok(found) => found,
            Err(e) if e.is::<NoElementFound>() => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to query listing cards"),
        };

        let mut elements = Vec::with_capacity(found.len());
        for element in &found {
            let text = element.get_inner_text()?;
            // The `href` property, unlike the attribute, is already absolute
            let href = element
                .call_js_fn("function() { return this.href; }", vec![], false)?
                .value;
            elements.push(PageElement {
                text,
                href: js_string(href),
            });
        }

        Ok(elements)
    }
}

fn js_string(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}
