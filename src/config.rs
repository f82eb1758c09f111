//! Run settings.
//!
//! Settings start from built-in defaults, are optionally replaced field by
//! field from a YAML file (`--config`), and finally overridden by CLI flags.
//! Every field is optional in the file:
//!
//! ```yaml
//! opinion_url: https://elpais.com/opinion/
//! num_articles: 5
//! source_language: es
//! target_language: en
//! min_occurrences: 3
//! images_dir: output/images
//! browser:
//!   window_width: 1920
//!   window_height: 1080
//!   mobile_device: iPhone 12 Pro
//! timeouts:
//!   page_load_secs: 30
//!   implicit_wait_secs: 10
//!   explicit_wait_secs: 15
//! platforms:
//!   - name: Windows 11 - Chrome
//!     browser_name: Chrome
//!     browser_version: latest
//!     os: Windows
//!     os_version: "11"
//! ```
//!
//! `platforms` replaces the built-in BrowserStack list as a whole.

use crate::analysis::DEFAULT_MIN_OCCURRENCES;
use crate::browser::{Platform, browserstack_presets};
use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Window and device emulation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub window_width: u32,
    pub window_height: u32,
    pub mobile_device: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            window_width: 1920,
            window_height: 1080,
            mobile_device: "iPhone 12 Pro".to_string(),
        }
    }
}

/// Timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    pub page_load_secs: u64,
    pub implicit_wait_secs: u64,
    /// How long to wait for a page's key element after navigating.
    pub explicit_wait_secs: u64,
    /// How long to wait for each cookie consent button candidate.
    pub consent_wait_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_secs: 30,
            implicit_wait_secs: 10,
            explicit_wait_secs: 15,
            consent_wait_secs: 3,
        }
    }
}

impl Timeouts {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn explicit_wait(&self) -> Duration {
        Duration::from_secs(self.explicit_wait_secs)
    }

    pub fn consent_wait(&self) -> Duration {
        Duration::from_secs(self.consent_wait_secs)
    }
}

/// Pauses between requests, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Delays {
    pub between_articles_ms: u64,
    pub between_translations_ms: u64,
    /// Pause after opening an article so late content can render.
    pub article_settle_ms: u64,
    pub retry_ms: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            between_articles_ms: 1000,
            between_translations_ms: 500,
            article_settle_ms: 2000,
            retry_ms: 1000,
        }
    }
}

/// All settings for a run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub opinion_url: String,
    pub num_articles: usize,
    pub source_language: String,
    pub target_language: String,
    pub min_occurrences: usize,
    pub images_dir: PathBuf,
    /// Attempts per translation and per image download.
    pub retry_attempts: usize,
    pub browser: BrowserSettings,
    pub timeouts: Timeouts,
    pub delays: Delays,
    /// BrowserStack platforms for `--platforms` runs.
    pub platforms: Vec<Platform>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://elpais.com".to_string(),
            opinion_url: "https://elpais.com/opinion/".to_string(),
            num_articles: 5,
            source_language: "es".to_string(),
            target_language: "en".to_string(),
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
            images_dir: PathBuf::from("output/images"),
            retry_attempts: 3,
            browser: BrowserSettings::default(),
            timeouts: Timeouts::default(),
            delays: Delays::default(),
            platforms: browserstack_presets(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML. Missing fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        Ok(settings)
    }

    /// Load settings from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No settings file given; using defaults");
            return Ok(Self::default());
        };
        let yaml = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = Self::from_yaml(&yaml)?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Apply CLI flags on top of the loaded settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(n) = cli.articles {
            self.num_articles = n;
        }
        if let Some(min) = cli.min_occurrences {
            self.min_occurrences = min;
        }
        if let Some(dir) = &cli.images_dir {
            self.images_dir = dir.clone();
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_articles == 0 {
            return Err(ConfigError::Invalid {
                field: "num_articles",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_occurrences == 0 {
            return Err(ConfigError::Invalid {
                field: "min_occurrences",
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "source_language/target_language",
                reason: "language codes cannot be empty".to_string(),
            });
        }
        if let Some(platform) = self
            .platforms
            .iter()
            .find(|p| p.name.trim().is_empty() || p.browser_name.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "platforms",
                reason: format!("platform {:?} needs a name and a browser_name", platform.name),
            });
        }
        url::Url::parse(&self.opinion_url).map_err(|e| ConfigError::Invalid {
            field: "opinion_url",
            reason: e.to_string(),
        })?;
        Ok(())
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.browser.window_width, self.browser.window_height)
    }

    pub fn between_articles(&self) -> Duration {
        Duration::from_millis(self.delays.between_articles_ms)
    }

    pub fn between_translations(&self) -> Duration {
        Duration::from_millis(self.delays.between_translations_ms)
    }

    pub fn article_settle(&self) -> Duration {
        Duration::from_millis(self.delays.article_settle_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.delays.retry_ms)
    }
}
