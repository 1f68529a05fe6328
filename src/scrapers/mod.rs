pub mod browser;
pub mod extract;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use browser::ChromeFetcher;
pub use extract::extract;
pub use snapshot::HtmlPage;
pub use traits::{FetchError, PageFetcher, RenderedPage};
