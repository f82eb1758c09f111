//! Headline translation with bounded retries.
//!
//! # Architecture
//!
//! - [`Translate`]: core trait, one text in, one translated text out
//! - [`GoogleTranslate`]: client for the public Google Translate web endpoint
//! - [`RetryTranslate`]: decorator that retries any [`Translate`] implementation
//! - [`translate_headlines`]: translates every headline in order, keeping the
//!   original text for any headline whose translation ultimately fails
//!
//! # Failure policy
//!
//! A failed headline never stops the batch and is never dropped: the output
//! always has one [`Translation`] per input title, in the same order.

use crate::models::{Article, Translation};
use crate::retry::RetryPolicy;
use crate::utils::truncate_text;
use reqwest::Client;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

/// Public endpoint used by the Google Translate web widget.
pub const GOOGLE_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Trait for async text translation.
pub trait Translate {
    /// Translate `text`, returning the translated string.
    async fn translate(&self, text: &str) -> Result<String, Box<dyn Error>>;
}

/// Client for Google Translate's `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: Client,
    endpoint: String,
    source: String,
    target: String,
}

impl GoogleTranslate {
    pub fn new(client: Client, source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        info!(%source, %target, "Translator initialized");
        Self {
            client,
            endpoint: GOOGLE_TRANSLATE_ENDPOINT.to_string(),
            source,
            target,
        }
    }

    /// Full request URL for `text`.
    pub fn request_url(&self, text: &str) -> String {
        format!(
            "{}?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.endpoint,
            self.source,
            self.target,
            urlencoding::encode(text)
        )
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The body looks like `[[["Hello world","Hola mundo",null,null,10]],null,"es"]`;
/// long inputs are split into several segments in the first array.
pub fn parse_translation(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}

#[derive(Debug)]
struct UnexpectedResponse(String);

impl fmt::Display for UnexpectedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected translation response: {}", self.0)
    }
}

impl Error for UnexpectedResponse {}

impl Translate for GoogleTranslate {
    #[instrument(level = "debug", skip_all)]
    async fn translate(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        debug!(text = %truncate_text(text, 50), "Translating");

        let body: Value = self
            .client
            .get(self.request_url(text))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let translated = parse_translation(&body)
            .ok_or_else(|| UnexpectedResponse(truncate_text(&body.to_string(), 200)))?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            translated = %truncate_text(&translated, 50),
            "Translated"
        );
        Ok(translated)
    }
}

/// Wrapper that retries any [`Translate`] implementation according to a [`RetryPolicy`].
pub struct RetryTranslate<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Translate> RetryTranslate<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        debug!(%policy, "Translation retries enabled");
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryTranslate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTranslate")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: Translate> Translate for RetryTranslate<T> {
    async fn translate(&self, text: &str) -> Result<String, Box<dyn Error>> {
        self.policy
            .run("translate", || self.inner.translate(text))
            .await
    }
}

/// Translate `titles` one by one, pausing `delay` between requests.
///
/// Empty titles translate to an empty string without a request. A title
/// whose translation fails keeps its original text.
#[instrument(level = "info", skip_all, fields(count = titles.len()))]
pub async fn translate_titles<T: Translate>(
    translator: &T,
    titles: &[String],
    delay: Duration,
) -> Vec<Translation> {
    let mut translations = Vec::with_capacity(titles.len());

    for (i, title) in titles.iter().enumerate() {
        info!(index = i + 1, total = titles.len(), "Translating title");
        let translated = if title.is_empty() {
            String::new()
        } else {
            match translator.translate(title).await {
                Ok(translated) => translated,
                Err(e) => {
                    error!(
                        error = %e,
                        title = %truncate_text(title, 50),
                        "Translation failed; keeping original text"
                    );
                    title.clone()
                }
            }
        };
        translations.push(Translation {
            original: title.clone(),
            translated,
        });

        if i + 1 < titles.len() && !delay.is_zero() {
            sleep(delay).await;
        }
    }

    info!(count = translations.len(), "Translated titles");
    translations
}

/// Translate the headline of every article, preserving order and count.
pub async fn translate_headlines<T: Translate>(
    translator: &T,
    articles: &[Article],
    delay: Duration,
) -> Vec<Translation> {
    let titles: Vec<String> = articles.iter().map(|a| a.title.clone()).collect();
    translate_titles(translator, &titles, delay).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Dictionary-backed translator; words not in the dictionary fail.
    struct Dictionary {
        entries: HashMap<&'static str, &'static str>,
        calls: Cell<usize>,
    }

    impl Dictionary {
        fn new(entries: &[(&'static str, &'static str)]) -> Self {
            Self {
                entries: entries.iter().copied().collect(),
                calls: Cell::new(0),
            }
        }
    }

    impl Translate for Dictionary {
        async fn translate(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            self.entries
                .get(text)
                .map(|t| t.to_string())
                .ok_or_else(|| format!("no translation for {text}").into())
        }
    }

    /// Fails a fixed number of times, then echoes the input in upper case.
    struct Flaky {
        failures_left: Cell<usize>,
    }

    impl Translate for Flaky {
        async fn translate(&self, text: &str) -> Result<String, Box<dyn Error>> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("temporarily unavailable".into());
            }
            Ok(text.to_uppercase())
        }
    }

    fn article(title: &str) -> Article {
        Article {
            url: format!("https://elpais.com/opinion/2026-01-15/{title}.html"),
            title: title.to_string(),
            content: String::new(),
            image_url: None,
            image_path: None,
        }
    }

    #[test]
    fn test_parse_translation_single_segment() {
        let body = json!([[["Hello world", "Hola mundo", null, null, 10]], null, "es"]);
        assert_eq!(parse_translation(&body), Some("Hello world".to_string()));
    }

    #[test]
    fn test_parse_translation_joins_segments() {
        let body = json!([
            [["The crisis. ", "La crisis. ", null], ["Europe waits.", "Europa espera.", null]],
            null,
            "es"
        ]);
        assert_eq!(
            parse_translation(&body),
            Some("The crisis. Europe waits.".to_string())
        );
    }

    #[test]
    fn test_parse_translation_rejects_unexpected_shapes() {
        assert_eq!(parse_translation(&json!({})), None);
        assert_eq!(parse_translation(&json!([null])), None);
        assert_eq!(parse_translation(&json!([[]])), None);
    }

    #[test]
    fn test_request_url_encodes_text() {
        let translator = GoogleTranslate::new(Client::new(), "es", "en");
        let url = translator.request_url("¿Qué pasa? Sí & no");
        assert!(url.starts_with(GOOGLE_TRANSLATE_ENDPOINT));
        assert!(url.contains("sl=es&tl=en"));
        assert!(url.ends_with("q=%C2%BFQu%C3%A9%20pasa%3F%20S%C3%AD%20%26%20no"));
    }

    #[tokio::test]
    async fn test_translate_titles_keeps_order_and_originals() {
        let translator = Dictionary::new(&[("Hola mundo", "Hello world"), ("Buenas noches", "Good night")]);
        let titles = vec![
            "Hola mundo".to_string(),
            "Sin traducción".to_string(),
            "Buenas noches".to_string(),
        ];

        let translations = translate_titles(&translator, &titles, Duration::ZERO).await;

        assert_eq!(translations.len(), 3);
        assert_eq!(translations[0].translated, "Hello world");
        assert_eq!(translations[1].original, "Sin traducción");
        assert_eq!(translations[1].translated, "Sin traducción");
        assert_eq!(translations[2].translated, "Good night");
    }

    #[tokio::test]
    async fn test_translate_titles_skips_empty_text() {
        let translator = Dictionary::new(&[]);
        let translations = translate_titles(&translator, &[String::new()], Duration::ZERO).await;

        assert_eq!(translations[0].translated, "");
        assert_eq!(translator.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_translate_headlines_from_articles() {
        let translator = Dictionary::new(&[("Primera noticia", "First news")]);
        let articles = vec![article("Primera noticia"), article("Segunda noticia")];

        let results = translate_headlines(&translator, &articles, Duration::ZERO).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].original, "Primera noticia");
        assert_eq!(results[0].translated, "First news");
        assert_eq!(results[1].translated, "Segunda noticia");
    }

    #[tokio::test]
    async fn test_retry_translate_recovers() {
        let flaky = Flaky {
            failures_left: Cell::new(2),
        };
        let translator = RetryTranslate::new(flaky, RetryPolicy::fixed(3, Duration::from_millis(1)));
        assert_eq!(translator.translate("hola").await.unwrap(), "HOLA");
    }

    #[tokio::test]
    async fn test_retry_translate_gives_up() {
        let translator = RetryTranslate::new(
            Dictionary::new(&[]),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
        );
        assert!(translator.translate("nada").await.is_err());
        assert_eq!(translator.inner.calls.get(), 3);
    }
}
