//! JSON run report.
//!
//! The report bundles the run date and time, the settings that shaped the
//! run, every scraped article, the headline translations and the ranked
//! repeated words:
//!
//! ```text
//! {
//!   "local_date": "2026-01-15",
//!   "local_time": "09:30:00",
//!   "browser": "chrome",
//!   ...
//!   "repeated_words": [{"word": "the", "count": 4}]
//! }
//! ```

use crate::models::RunReport;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `report` as pretty-printed JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create report directory");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(articles = report.articles.len(), "Wrote JSON report");
    Ok(())
}
