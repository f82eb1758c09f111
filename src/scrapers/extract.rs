//! Ordered extraction strategies with a terminal default.
//!
//! Page layouts drift, so every field is read through a [`FallbackChain`]:
//! a list of [`Strategy`] values tried in order until one produces a value.
//! If none does, the chain's default is used (which may itself be `None`).
//!
//! A strategy that errors (bad selector, stale element, transport failure)
//! counts as "no match" and the next strategy is tried.

use crate::browser::Browser;
use tracing::debug;

/// One way of reading a value from the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// First non-empty trimmed text of the elements matching the selector.
    FirstText(&'static str),
    /// The first `limit` non-empty trimmed texts, joined with a space.
    JoinedText {
        selector: &'static str,
        limit: usize,
    },
    /// First value of attribute `name` on the matching elements.
    ///
    /// With `require_http`, only values that look like http(s) URLs count.
    Attribute {
        selector: &'static str,
        name: &'static str,
        require_http: bool,
    },
}

impl Strategy {
    pub fn selector(&self) -> &'static str {
        match self {
            Strategy::FirstText(selector) => selector,
            Strategy::JoinedText { selector, .. } => selector,
            Strategy::Attribute { selector, .. } => selector,
        }
    }

    /// Try this strategy against the current page.
    pub async fn attempt<B: Browser>(&self, browser: &mut B) -> Option<String> {
        let found = match self {
            Strategy::FirstText(selector) => browser.texts(selector).await.map(|texts| {
                texts
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .find(|t| !t.is_empty())
            }),
            Strategy::JoinedText { selector, limit } => {
                browser.texts(selector).await.map(|texts| {
                    let parts: Vec<String> = texts
                        .into_iter()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .take(*limit)
                        .collect();
                    (!parts.is_empty()).then(|| parts.join(" "))
                })
            }
            Strategy::Attribute {
                selector,
                name,
                require_http,
            } => browser.attrs(selector, name).await.map(|values| {
                values
                    .into_iter()
                    .find(|v| !v.is_empty() && (!*require_http || is_http_url(v)))
            }),
        };

        match found {
            Ok(value) => value,
            Err(e) => {
                debug!(selector = self.selector(), error = %e, "Strategy failed");
                None
            }
        }
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Strategies tried in order, with a value to fall back on.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    field: &'static str,
    strategies: Vec<Strategy>,
    default: Option<String>,
}

impl FallbackChain {
    pub fn new(field: &'static str, strategies: Vec<Strategy>) -> Self {
        Self {
            field,
            strategies,
            default: None,
        }
    }

    /// Value returned when no strategy matches.
    pub fn or_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// First strategy result, else the default.
    pub async fn resolve<B: Browser>(&self, browser: &mut B) -> Option<String> {
        for (i, strategy) in self.strategies.iter().enumerate() {
            if let Some(value) = strategy.attempt(browser).await {
                debug!(field = self.field, strategy = i, selector = strategy.selector(), "Extracted");
                return Some(value);
            }
        }
        debug!(field = self.field, "No strategy matched; using default");
        self.default.clone()
    }
}
