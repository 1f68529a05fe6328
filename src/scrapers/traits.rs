use crate::scrapers::types::PageElement;
use anyhow::Result;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    /// Navigation or content wait ran out of time. Retry the same page.
    #[error("timed out loading page {page}")]
    Timeout { page: u32 },

    /// Anything else the browser or network threw at us
    #[error("browser fault on page {page}: {cause:#}")]
    Driver { page: u32, cause: anyhow::Error },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// A loaded results page that can be searched for listing cards
pub trait RenderedPage {
    /// All elements carrying the `marker` class, in document order
    fn find_by_marker(&self, marker: &str) -> Result<Vec<PageElement>>;
}

/// Common trait for listing page sources.
/// The pipeline only talks to this, so it can run without a real browser.
pub trait PageFetcher {
    type Page: RenderedPage;

    /// Load results page `page` and wait until listings have rendered
    fn fetch(&mut self, page: u32) -> Result<Self::Page, FetchError>;

    /// Get the name of the page source
    fn source_name(&self) -> &'static str;
}
