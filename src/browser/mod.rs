//! Browser automation behind a small trait.
//!
//! The scraper only needs a handful of capabilities from a browser: load a
//! page, wait for an element, read element text or attributes, and click.
//! [`Browser`] captures exactly that, with two implementations:
//!
//! | Implementation | Module | Notes |
//! |----------------|--------|-------|
//! | [`WebDriverSession`] | [`webdriver`] | W3C WebDriver client (chromedriver, geckodriver, msedgedriver, BrowserStack) |
//! | [`StaticBrowser`] | [`static_page`] | Plain HTTP + HTML parsing, no JavaScript; also serves fixture pages in tests |
//!
//! Hosted BrowserStack platforms for parallel runs live in [`platform`].
//!
//! # Lifecycle
//!
//! A session is acquired once per run and must be released on every exit
//! path. [`with_browser`] runs a scraping closure and closes the browser
//! afterwards whatever the closure returned. A [`WebDriverSession`] that is
//! dropped without being closed (for example while unwinding from a panic)
//! still schedules the remote `DELETE /session` on the runtime.

pub mod platform;
pub mod static_page;
pub mod webdriver;

pub use platform::{Platform, browserstack_presets};
pub use static_page::StaticBrowser;
pub use webdriver::{SessionOptions, WebDriverSession};

use clap::ValueEnum;
use futures::future::LocalBoxFuture;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Which browser to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
    /// No browser at all: fetch pages over HTTP and parse the static HTML.
    Static,
}

impl BrowserKind {
    /// The `browserName` capability sent to a WebDriver server.
    pub fn webdriver_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "MicrosoftEdge",
            BrowserKind::Static => "static",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "edge",
            BrowserKind::Static => "static",
        };
        f.write_str(name)
    }
}

/// Errors raised while driving a browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebDriver error `{error}`: {message}")]
    Protocol { error: String, message: String },

    #[error("unexpected WebDriver response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("{0} cannot be driven through WebDriver")]
    Unsupported(BrowserKind),

    #[error("no page has been loaded")]
    NoPage,

    #[error("no stored page for {0} and network access is disabled")]
    Offline(String),

    #[error("browser session is closed")]
    Closed,
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// The browser capabilities the scraper relies on.
pub trait Browser {
    /// Load `url` and wait for the navigation to finish.
    async fn goto(&mut self, url: &str) -> BrowserResult<()>;

    /// Wait until at least one element matches `css`, up to `timeout`.
    ///
    /// Returns `false` on timeout.
    async fn wait_for(&mut self, css: &str, timeout: Duration) -> BrowserResult<bool>;

    /// Visible text of every element matching `css`, in document order.
    async fn texts(&mut self, css: &str) -> BrowserResult<Vec<String>>;

    /// Value of `name` on every matching element that has it.
    ///
    /// `href` and `src` are returned as absolute URLs.
    async fn attrs(&mut self, css: &str, name: &str) -> BrowserResult<Vec<String>>;

    /// Click the first element matching `css`. Returns `false` if nothing was clicked.
    async fn click(&mut self, css: &str) -> BrowserResult<bool>;

    /// URL of the currently loaded page.
    fn current_url(&self) -> Option<&str>;

    /// Release the browser. Calling it twice is harmless.
    async fn close(&mut self) -> BrowserResult<()>;
}

/// Run `f` with exclusive access to `browser`, then close the browser.
///
/// The browser is closed after `f` completes regardless of what it returned;
/// close failures are logged, never surfaced.
///
/// ```ignore
/// let articles = with_browser(session, move |b| scrape_all(b, job).boxed_local()).await;
/// ```
pub async fn with_browser<B, T, F>(mut browser: B, f: F) -> T
where
    B: Browser,
    F: for<'a> FnOnce(&'a mut B) -> LocalBoxFuture<'a, T>,
{
    let result = f(&mut browser).await;
    match browser.close().await {
        Ok(()) => info!("Browser closed"),
        Err(e) => warn!(error = %e, "Error closing browser"),
    }
    result
}
