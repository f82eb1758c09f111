//! El País opinion section scraper.
//!
//! Works in two phases against any [`Browser`]:
//!
//! 1. **Indexing**: open the opinion front page, dismiss the cookie banner and
//!    collect links to dated opinion pieces (`/opinion/YYYY-MM-DD/...`).
//! 2. **Fetching**: open each link and read the headline, the first paragraphs
//!    and the cover image through [`FallbackChain`]s.
//!
//! Articles are visited one at a time with a pause in between. An article
//! that fails to load is logged and skipped.

use super::extract::{FallbackChain, Strategy};
use crate::browser::{Browser, with_browser};
use crate::config::Settings;
use crate::images::{download_image, image_path};
use crate::models::Article;
use crate::retry::RetryPolicy;
use crate::utils::truncate_text;
use futures::FutureExt;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Cookie consent buttons, most specific first.
const CONSENT_SELECTORS: [&str; 5] = [
    "button[id*='accept']",
    "button[id*='consent']",
    "button.didomi-button",
    "#didomi-notice-agree-button",
    "button[aria-label*='Accept']",
];

const LINK_SELECTORS: [&str; 3] = [
    "article a[href*='/opinion/']",
    "a[href*='/opinion/2']",
    ".c_h a[href*='/opinion/']",
];

const CONSENT_SETTLE: Duration = Duration::from_secs(1);
const IMAGE_MAX_BACKOFF: Duration = Duration::from_secs(10);
const IMAGE_JITTER_MS: u64 = 250;

pub const NO_TITLE: &str = "No title found";
pub const NO_CONTENT: &str = "No content found";

/// Opinion pieces carry their publication date in the path.
static DATED_OPINION: Lazy<Regex> = Lazy::new(|| Regex::new(r"/opinion/\d{4}").unwrap());

fn title_chain() -> FallbackChain {
    FallbackChain::new(
        "title",
        vec![
            Strategy::FirstText("h1"),
            Strategy::FirstText("h1.a_t"),
            Strategy::FirstText(".article_header h1"),
            Strategy::FirstText("header h1"),
        ],
    )
    .or_default(NO_TITLE)
}

fn content_chain() -> FallbackChain {
    let paragraphs = |selector| Strategy::JoinedText { selector, limit: 3 };
    FallbackChain::new(
        "content",
        vec![
            paragraphs("article p"),
            paragraphs(".a_c p"),
            paragraphs(".article_body p"),
            paragraphs("div[itemprop='articleBody'] p"),
        ],
    )
    .or_default(NO_CONTENT)
}

fn image_chain() -> FallbackChain {
    let src = |selector| Strategy::Attribute {
        selector,
        name: "src",
        require_http: true,
    };
    FallbackChain::new(
        "image",
        vec![
            src("article img"),
            src(".a_m img"),
            src("figure img"),
            src("img[itemprop='image']"),
            src(".article_header img"),
        ],
    )
}

/// Everything a scraping run needs, owned so it can move into the browser scope.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub settings: Settings,
    pub client: Client,
    pub image_policy: RetryPolicy,
    /// Where cover images go; `None` disables downloads.
    pub images_dir: Option<PathBuf>,
}

impl ScrapeJob {
    pub fn new(settings: Settings, client: Client) -> Self {
        let image_policy = RetryPolicy::exponential(
            settings.retry_attempts,
            settings.retry_delay(),
            IMAGE_MAX_BACKOFF,
        )
        .with_jitter(IMAGE_JITTER_MS);
        let images_dir = Some(settings.images_dir.clone());
        Self {
            settings,
            client,
            image_policy,
            images_dir,
        }
    }

    pub fn without_images(mut self) -> Self {
        self.images_dir = None;
        self
    }
}

/// Open the opinion front page and wait for its article list.
#[instrument(level = "info", skip_all, fields(url = %settings.opinion_url))]
pub async fn navigate_to_opinion<B: Browser>(
    browser: &mut B,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    browser.goto(&settings.opinion_url).await?;
    if !browser
        .wait_for("article", settings.timeouts.explicit_wait())
        .await?
    {
        return Err("timed out waiting for the opinion section to load".into());
    }
    accept_cookies(browser, settings.timeouts.consent_wait()).await;
    info!("Opened opinion section");
    Ok(())
}

/// Click the first cookie consent button that shows up. Returns whether one was clicked.
pub async fn accept_cookies<B: Browser>(browser: &mut B, wait: Duration) -> bool {
    for selector in CONSENT_SELECTORS {
        match browser.wait_for(selector, wait).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                debug!(selector, error = %e, "Consent selector failed");
                continue;
            }
        }
        match browser.click(selector).await {
            Ok(true) => {
                info!(selector, "Accepted cookie consent");
                sleep(CONSENT_SETTLE).await;
                return true;
            }
            Ok(false) => continue,
            Err(e) => debug!(selector, error = %e, "Consent click failed"),
        }
    }
    debug!("No cookie consent banner found");
    false
}

/// Up to `count` distinct dated opinion links under `base_url`, in page order.
#[instrument(level = "info", skip(browser))]
pub async fn article_links<B: Browser>(browser: &mut B, base_url: &str, count: usize) -> Vec<String> {
    let mut found = Vec::new();
    for selector in LINK_SELECTORS {
        match browser.attrs(selector, "href").await {
            Ok(hrefs) => found.extend(hrefs),
            Err(e) => debug!(selector, error = %e, "Link selector failed"),
        }
        if found.iter().unique().filter(|h| is_opinion_link(h, base_url)).count() >= count {
            break;
        }
    }

    let links: Vec<String> = found
        .into_iter()
        .filter(|href| is_opinion_link(href, base_url))
        .unique()
        .take(count)
        .collect();
    info!(count = links.len(), "Found article links");
    debug!(links = ?links, "Opinion links");
    links
}

/// A dated opinion piece hosted on the same site as `base_url`.
fn is_opinion_link(href: &str, base_url: &str) -> bool {
    let (Ok(link), Ok(base)) = (Url::parse(href), Url::parse(base_url)) else {
        return false;
    };
    link.host_str().is_some_and(|host| Some(host) == base.host_str())
        && DATED_OPINION.is_match(link.path())
}

/// Open `url` and extract one article.
#[instrument(level = "info", skip(browser, settings))]
pub async fn scrape_article<B: Browser>(
    browser: &mut B,
    url: &str,
    settings: &Settings,
) -> Result<Article, Box<dyn Error>> {
    browser.goto(url).await?;
    if !browser.wait_for("h1", settings.timeouts.explicit_wait()).await? {
        return Err("timed out waiting for the headline".into());
    }
    let settle = settings.article_settle();
    if !settle.is_zero() {
        sleep(settle).await;
    }

    let title = title_chain()
        .resolve(browser)
        .await
        .unwrap_or_else(|| NO_TITLE.to_string());
    let content = content_chain()
        .resolve(browser)
        .await
        .unwrap_or_else(|| NO_CONTENT.to_string());
    let image_url = image_chain().resolve(browser).await;

    info!(title = %truncate_text(&title, 50), has_image = image_url.is_some(), "Scraped article");
    Ok(Article {
        url: url.to_string(),
        title,
        content,
        image_url,
        image_path: None,
    })
}

/// Index the opinion section and scrape up to `num_articles` pieces.
#[instrument(level = "info", skip_all, fields(count = job.settings.num_articles))]
pub async fn scrape_all<B: Browser>(browser: &mut B, job: ScrapeJob) -> Vec<Article> {
    let settings = &job.settings;
    if let Err(e) = navigate_to_opinion(browser, settings).await {
        error!(error = %e, "Failed to open opinion section");
        return Vec::new();
    }

    let links = article_links(browser, &settings.base_url, settings.num_articles).await;
    if links.is_empty() {
        error!("No article links found");
        return Vec::new();
    }

    let mut articles = Vec::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        info!(index = i + 1, total = links.len(), "Scraping article");
        match scrape_article(browser, link, settings).await {
            Ok(mut article) => {
                if let (Some(dir), Some(url)) = (&job.images_dir, &article.image_url) {
                    let path = image_path(dir, &article.title);
                    if download_image(&job.client, url, &path, &job.image_policy).await {
                        article.image_path = Some(path);
                    }
                }
                articles.push(article);
            }
            Err(e) => warn!(error = %e, url = %link, "Skipping article"),
        }

        let pause = settings.between_articles();
        if i + 1 < links.len() && !pause.is_zero() {
            sleep(pause).await;
        }
    }

    info!(count = articles.len(), "Scraped articles");
    articles
}

/// Scrape with `browser`, closing it afterwards.
pub async fn run<B: Browser>(browser: B, job: ScrapeJob) -> Vec<Article> {
    with_browser(browser, move |b| scrape_all(b, job).boxed_local()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticBrowser;
    use crate::config::{Delays, Timeouts};

    const FRONT: &str = r#"
        <html><body>
          <div id="didomi-host"><button id="didomi-notice-agree-button">Aceptar</button></div>
          <article><h2><a href="/opinion/2026-01-15/europa-y-la-crisis.html">Europa y la crisis</a></h2></article>
          <article><h2><a href="/opinion/2026-01-15/europa-y-la-crisis.html">(duplicado)</a></h2></article>
          <article><h2><a href="/opinion/editoriales/">Editoriales</a></h2></article>
          <article><h2><a href="https://cincodias.elpais.com/opinion/2026-01-14/otra.html">Otra web</a></h2></article>
          <div class="c_h"><a href="/opinion/2026-01-14/la-vivienda.html">La vivienda</a></div>
          <article><h2><a href="/opinion/2026-01-13/sin-pagina.html">Sin página</a></h2></article>
        </body></html>
    "#;

    const FIRST: &str = r#"
        <html><body><article>
          <h1>Europa y la crisis</h1>
          <figure><img src="https://imagenes.elpais.com/europa.jpg"></figure>
          <p>Primer párrafo.</p><p>Segundo párrafo.</p><p>Tercer párrafo.</p><p>Cuarto.</p>
        </article></body></html>
    "#;

    const SECOND: &str = r#"
        <html><body>
          <header><h1>La vivienda</h1></header>
          <div class="a_c"><p>Un solo párrafo.</p></div>
        </body></html>
    "#;

    fn quick_settings() -> Settings {
        Settings {
            num_articles: 5,
            timeouts: Timeouts {
                explicit_wait_secs: 0,
                consent_wait_secs: 0,
                ..Timeouts::default()
            },
            delays: Delays {
                between_articles_ms: 0,
                between_translations_ms: 0,
                article_settle_ms: 0,
                retry_ms: 0,
            },
            ..Settings::default()
        }
    }

    fn site() -> StaticBrowser {
        StaticBrowser::offline()
            .with_page("https://elpais.com/opinion/", FRONT)
            .with_page("https://elpais.com/opinion/2026-01-15/europa-y-la-crisis.html", FIRST)
            .with_page("https://elpais.com/opinion/2026-01-14/la-vivienda.html", SECOND)
    }

    #[test]
    fn test_opinion_link_filter() {
        let base = "https://elpais.com";
        assert!(is_opinion_link("https://elpais.com/opinion/2026-01-15/a.html", base));
        assert!(!is_opinion_link("https://elpais.com/opinion/editoriales/", base));
        assert!(!is_opinion_link("https://cincodias.elpais.com/opinion/2026-01-15/a.html", base));
        assert!(!is_opinion_link("https://elpais.com.evil.example/opinion/2026-01-15/a.html", base));
        assert!(!is_opinion_link("https://evil.example/?next=https://elpais.com/opinion/2026-01-15", base));
        assert!(!is_opinion_link("/opinion/2026-01-15/a.html", base));
    }

    #[tokio::test]
    async fn test_article_links_are_dated_unique_and_limited() {
        let mut browser = site();
        browser.goto("https://elpais.com/opinion/").await.unwrap();

        let links = article_links(&mut browser, "https://elpais.com", 5).await;
        assert_eq!(
            links,
            vec![
                "https://elpais.com/opinion/2026-01-15/europa-y-la-crisis.html",
                "https://elpais.com/opinion/2026-01-13/sin-pagina.html",
                "https://elpais.com/opinion/2026-01-14/la-vivienda.html",
            ]
        );

        let one = article_links(&mut browser, "https://elpais.com", 1).await;
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_scrape_article_uses_fallbacks() {
        let settings = quick_settings();
        let mut browser = site();

        let first = scrape_article(
            &mut browser,
            "https://elpais.com/opinion/2026-01-15/europa-y-la-crisis.html",
            &settings,
        )
        .await
        .unwrap();
        assert_eq!(first.title, "Europa y la crisis");
        assert_eq!(first.content, "Primer párrafo. Segundo párrafo. Tercer párrafo.");
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://imagenes.elpais.com/europa.jpg")
        );

        let second = scrape_article(
            &mut browser,
            "https://elpais.com/opinion/2026-01-14/la-vivienda.html",
            &settings,
        )
        .await
        .unwrap();
        assert_eq!(second.title, "La vivienda");
        assert_eq!(second.content, "Un solo párrafo.");
        assert_eq!(second.image_url, None);
    }

    #[tokio::test]
    async fn test_scrape_article_without_headline_fails() {
        let mut browser = StaticBrowser::offline().with_page(
            "https://elpais.com/opinion/2026-01-12/vacio.html",
            "<html><body><p>Nada</p></body></html>",
        );
        let result = scrape_article(
            &mut browser,
            "https://elpais.com/opinion/2026-01-12/vacio.html",
            &quick_settings(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_accept_cookies_without_clickable_button() {
        let mut browser = site();
        browser.goto("https://elpais.com/opinion/").await.unwrap();
        // Static pages find the button but cannot click it.
        assert!(!accept_cookies(&mut browser, Duration::ZERO).await);
    }

    #[tokio::test]
    async fn test_run_skips_failed_articles() {
        let job = ScrapeJob::new(quick_settings(), Client::new()).without_images();

        let articles = run(site(), job).await;

        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Europa y la crisis", "La vivienda"]);
        assert!(articles.iter().all(|a| a.image_path.is_none()));
    }

    #[tokio::test]
    async fn test_run_without_opinion_page() {
        let job = ScrapeJob::new(quick_settings(), Client::new()).without_images();
        let articles = run(StaticBrowser::offline(), job).await;
        assert!(articles.is_empty());
    }
}
