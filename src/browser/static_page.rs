//! JavaScript-free browser built on `reqwest` and `scraper`.
//!
//! Pages are fetched with a plain GET and queried with CSS selectors against
//! the parsed HTML. This is enough for server-rendered sites and keeps the
//! scraper testable offline: pages registered with
//! [`StaticBrowser::with_page`] are served from memory instead of the network.

use super::{Browser, BrowserError, BrowserResult};
use itertools::Itertools;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// User agent sent with every page and image request.
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug)]
struct Page {
    url: Url,
    html: String,
}

/// A [`Browser`] that reads static HTML.
#[derive(Debug)]
pub struct StaticBrowser {
    client: Option<Client>,
    pages: HashMap<String, String>,
    page: Option<Page>,
    closed: bool,
}

impl StaticBrowser {
    /// Browser that fetches unknown pages over the network.
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
            pages: HashMap::new(),
            page: None,
            closed: false,
        }
    }

    /// Browser that only serves pages registered with [`StaticBrowser::with_page`].
    pub fn offline() -> Self {
        Self {
            client: None,
            pages: HashMap::new(),
            page: None,
            closed: false,
        }
    }

    /// Serve `html` whenever `url` is requested.
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn page(&self) -> BrowserResult<&Page> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        self.page.as_ref().ok_or(BrowserError::NoPage)
    }

    /// Apply `f` to every element matching `css` on the current page.
    fn select_map<T>(
        &self,
        css: &str,
        f: impl Fn(&Url, ElementRef<'_>) -> Option<T>,
    ) -> BrowserResult<Vec<T>> {
        let page = self.page()?;
        let selector = Selector::parse(css).map_err(|e| BrowserError::InvalidSelector {
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        let document = Html::parse_document(&page.html);
        Ok(document
            .select(&selector)
            .filter_map(|element| f(&page.url, element))
            .collect())
    }
}

impl Browser for StaticBrowser {
    #[instrument(level = "debug", skip(self))]
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        let parsed = Url::parse(url)?;

        let html = match self.pages.get(url) {
            Some(html) => html.clone(),
            None => {
                let client = self
                    .client
                    .as_ref()
                    .ok_or_else(|| BrowserError::Offline(url.to_string()))?;
                client
                    .get(parsed.clone())
                    .header(USER_AGENT, DESKTOP_USER_AGENT)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?
            }
        };

        debug!(bytes = html.len(), "Loaded static page");
        self.page = Some(Page { url: parsed, html });
        Ok(())
    }

    async fn wait_for(&mut self, css: &str, _timeout: Duration) -> BrowserResult<bool> {
        // Static HTML never changes after load; presence is decided immediately.
        Ok(!self.select_map(css, |_, _| Some(()))?.is_empty())
    }

    async fn texts(&mut self, css: &str) -> BrowserResult<Vec<String>> {
        self.select_map(css, |_, element| {
            Some(element.text().flat_map(str::split_whitespace).join(" "))
        })
    }

    async fn attrs(&mut self, css: &str, name: &str) -> BrowserResult<Vec<String>> {
        let resolve = matches!(name, "href" | "src");
        self.select_map(css, |base, element| {
            let value = element.value().attr(name)?;
            if resolve {
                base.join(value).ok().map(String::from)
            } else {
                Some(value.to_string())
            }
        })
    }

    async fn click(&mut self, css: &str) -> BrowserResult<bool> {
        debug!(css, "Static pages have no scripts; click ignored");
        self.page()?;
        Ok(false)
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|page| page.url.as_str())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.page = None;
        self.closed = true;
        Ok(())
    }
}
