use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Page to start from when nothing usable is on disk
pub const FIRST_PAGE: u32 = 1;

/// Resume cursor: the last results page whose listings were collected
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persisted page number, or page 1 when the marker is missing or
    /// unreadable. A damaged marker restarts the scrape, it never stops it.
    pub fn read(&self) -> u32 {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No progress marker at {}, starting fresh", self.path.display());
                return FIRST_PAGE;
            }
            Err(e) => {
                warn!("Cannot read progress marker {}: {}", self.path.display(), e);
                return FIRST_PAGE;
            }
        };

        match raw.trim().parse::<u32>() {
            Ok(page) if page >= FIRST_PAGE => page,
            _ => {
                warn!(
                    "Ignoring unusable progress marker {:?} in {}",
                    raw.trim(),
                    self.path.display()
                );
                FIRST_PAGE
            }
        }
    }

    /// Replace the marker. The value goes to a sibling file first and is
    /// renamed into place, so readers see the old or the new page, never
    /// half of one.
    pub fn write(&self, page: u32) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, page.to_string())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to update progress marker {}", self.path.display()))?;

        debug!("Progress marker set to page {}", page);
        Ok(())
    }
}
