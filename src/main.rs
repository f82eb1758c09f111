//! # Opinion Word Frequency
//!
//! Scrapes the latest pieces from the El País opinion section, translates
//! their headlines and reports the words that repeat across the translated
//! headlines.
//!
//! ## Features
//!
//! - Drives Chrome, Firefox or Edge through any W3C WebDriver server, locally
//!   or on BrowserStack, or reads the static HTML with no browser at all
//! - Runs the whole pipeline on several BrowserStack platforms in parallel
//!   and reports each session as passed or failed
//! - Extracts headline, opening paragraphs and cover image with ordered
//!   selector fallbacks, and downloads the cover images
//! - Translates headlines with bounded retries; failures keep the original text
//! - Counts words across the translated headlines and ranks those that repeat
//! - Optionally writes the whole run as a JSON report
//!
//! ## Usage
//!
//! ```sh
//! opinion_wordfreq --browser chrome --headless -j ./output/report.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: open the opinion section and read each article ([`scrapers`])
//! 2. **Translation**: translate every headline ([`translate`])
//! 3. **Analysis**: count, filter and rank repeated words ([`analysis`])
//! 4. **Output**: console sections and the optional JSON report ([`outputs`])

use chrono::Local;
use clap::Parser;
use futures::FutureExt;
use futures::future::join_all;
use reqwest::Client;
use std::error::Error;
use std::io::{self, Write};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod browser;
mod cli;
mod config;
mod images;
mod models;
mod outputs;
mod retry;
mod scrapers;
mod translate;
mod utils;

use analysis::{AnalysisError, RankedResult};
use browser::webdriver::{BROWSERSTACK_HUB, RemoteOptions};
use browser::{BrowserKind, Platform, SessionOptions, StaticBrowser, WebDriverSession, with_browser};
use cli::Cli;
use config::Settings;
use models::{Article, PlatformRun, RunReport, Translation};
use outputs::{console, json};
use retry::RetryPolicy;
use scrapers::elpais::{self, ScrapeJob};
use translate::{GoogleTranslate, RetryTranslate, translate_headlines};
use utils::ensure_writable_dir;

const PROJECT_NAME: &str = "El Pais Opinion Word Frequency";
const BUILD_NAME: &str = "El Pais Opinion Scraper";
const PARALLEL_BUILD_NAME: &str = "El Pais Opinion Scraper - Parallel";

/// BrowserStack user name and access key, from flags or the environment.
fn browserstack_credentials(args: &Cli) -> Result<(String, String), Box<dyn Error>> {
    match (&args.browserstack_username, &args.browserstack_access_key) {
        (Some(username), Some(access_key)) => Ok((username.clone(), access_key.clone())),
        _ => Err(
            "BrowserStack runs need BROWSERSTACK_USERNAME and BROWSERSTACK_ACCESS_KEY (or the matching flags)"
                .into(),
        ),
    }
}

/// BrowserStack session labels, required when `--remote` is set.
fn remote_options(args: &Cli) -> Result<Option<RemoteOptions>, Box<dyn Error>> {
    if !args.remote {
        return Ok(None);
    }
    let (username, access_key) = browserstack_credentials(args)?;
    Ok(Some(RemoteOptions {
        username,
        access_key,
        project_name: PROJECT_NAME.to_string(),
        build_name: BUILD_NAME.to_string(),
        session_name: format!("{} scrape", utils::upcase(&args.browser.to_string())),
    }))
}

fn session_options(args: &Cli, settings: &Settings) -> SessionOptions {
    SessionOptions {
        kind: args.browser,
        headless: args.headless,
        mobile: args.mobile,
        window_size: settings.window_size(),
        mobile_device: settings.browser.mobile_device.clone(),
        page_load_timeout: settings.timeouts.page_load(),
        implicit_wait: settings.timeouts.implicit_wait(),
        remote: None,
        platform: None,
    }
}

/// Open the requested browser and scrape with it.
#[instrument(level = "info", skip_all, fields(browser = %args.browser))]
async fn scrape(
    args: &Cli,
    settings: &Settings,
    client: &Client,
) -> Result<Vec<Article>, Box<dyn Error>> {
    let mut job = ScrapeJob::new(settings.clone(), client.clone());
    if args.skip_images {
        job = job.without_images();
    }

    if args.browser == BrowserKind::Static {
        if args.remote {
            warn!("--remote has no effect with the static browser");
        }
        return Ok(elpais::run(StaticBrowser::new(client.clone()), job).await);
    }

    let remote = remote_options(args)?;
    let server = if remote.is_some() {
        BROWSERSTACK_HUB
    } else {
        args.webdriver_url.as_str()
    };
    let options = SessionOptions {
        remote,
        ..session_options(args, settings)
    };

    let session = WebDriverSession::start(client.clone(), server, &options).await?;
    Ok(elpais::run(session, job).await)
}

/// Translate the headlines of `articles` and rank the repeated words.
async fn translate_and_analyze(
    settings: &Settings,
    client: &Client,
    articles: &[Article],
) -> Result<(Vec<Translation>, RankedResult), AnalysisError> {
    let translator = RetryTranslate::new(
        GoogleTranslate::new(
            client.clone(),
            &settings.source_language,
            &settings.target_language,
        ),
        RetryPolicy::fixed(settings.retry_attempts, settings.retry_delay()),
    );
    let translations =
        translate_headlines(&translator, articles, settings.between_translations()).await;
    let headlines: Vec<&str> = translations.iter().map(|t| t.translated.as_str()).collect();
    let repeated_words = analysis::analyze(&headlines, settings.min_occurrences)?;
    Ok((translations, repeated_words))
}

/// Run the whole pipeline in one BrowserStack session on `platform`.
///
/// The session is marked passed or failed on the dashboard before it closes.
#[instrument(level = "info", skip_all, fields(platform = %platform.name))]
async fn run_on_platform(
    platform: Platform,
    options: SessionOptions,
    settings: &Settings,
    client: &Client,
) -> PlatformRun {
    let name = platform.name.clone();
    let options = SessionOptions {
        platform: Some(platform),
        ..options
    };
    let session = match WebDriverSession::start(client.clone(), BROWSERSTACK_HUB, &options).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Could not start BrowserStack session");
            return PlatformRun::failed(name, e.to_string());
        }
    };

    // Platforms run at the same time and would overwrite each other's images.
    let job = ScrapeJob::new(settings.clone(), client.clone()).without_images();
    let settings = settings.clone();
    let client = client.clone();
    with_browser(session, move |session| {
        async move {
            let articles = elpais::scrape_all(session, job).await;
            let run = if articles.is_empty() {
                PlatformRun::failed(name, "no articles were scraped")
            } else {
                match translate_and_analyze(&settings, &client, &articles).await {
                    Ok((translations, repeated_words)) => PlatformRun {
                        platform: name,
                        articles,
                        translations,
                        repeated_words,
                        error: None,
                    },
                    Err(e) => PlatformRun::failed(name, e.to_string()),
                }
            };

            let reason = match &run.error {
                Some(error) => error.clone(),
                None => format!(
                    "scraped {} articles, {} repeated words",
                    run.articles.len(),
                    run.repeated_words.len()
                ),
            };
            if let Err(e) = session.set_session_status(run.passed(), &reason).await {
                warn!(error = %e, "Could not report session status");
            }
            run
        }
        .boxed_local()
    })
    .await
}

/// Run the pipeline on every configured platform at the same time.
async fn run_platforms(
    args: &Cli,
    settings: &Settings,
    client: &Client,
) -> Result<Vec<PlatformRun>, Box<dyn Error>> {
    let (username, access_key) = browserstack_credentials(args)?;
    if settings.platforms.is_empty() {
        return Err("no BrowserStack platforms are configured".into());
    }
    info!(count = settings.platforms.len(), "Starting parallel BrowserStack runs");

    let runs = settings.platforms.iter().map(|platform| {
        let options = SessionOptions {
            remote: Some(RemoteOptions {
                username: username.clone(),
                access_key: access_key.clone(),
                project_name: PROJECT_NAME.to_string(),
                build_name: PARALLEL_BUILD_NAME.to_string(),
                session_name: platform.session_name(),
            }),
            ..session_options(args, settings)
        };
        run_on_platform(platform.clone(), options, settings, client)
    });
    Ok(join_all(runs).await)
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("opinion_wordfreq starting up");

    // Parse CLI and settings
    let args = Cli::parse();
    debug!(browser = %args.browser, headless = args.headless, mobile = args.mobile, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref()).await?;
    settings.apply_cli(&args);
    settings.validate()?;

    if args.platforms {
        let client = Client::builder().build()?;
        let runs = run_platforms(&args, &settings, &client).await?;
        let mut out = io::stdout();
        console::print_platform_runs(&mut out, &runs, settings.min_occurrences)?;
        out.flush()?;

        let failed = runs.iter().filter(|r| !r.passed()).count();
        info!(
            platforms = runs.len(),
            failed,
            elapsed_secs = start_time.elapsed().as_secs_f64(),
            "Parallel run complete"
        );
        if failed > 0 {
            return Err(format!("{failed} of {} platforms failed", runs.len()).into());
        }
        return Ok(());
    }

    let images_dir = (!args.skip_images).then(|| settings.images_dir.clone());

    // Early check: ensure the images dir is writable
    if let Some(dir) = &images_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Images directory is not writable (fix perms, choose another --images-dir, or pass --skip-images)"
            );
            return Err(e);
        }
    }

    let mut out = io::stdout();
    console::print_banner(
        &mut out,
        &settings,
        args.browser,
        args.headless,
        args.mobile,
        images_dir.as_deref(),
    )?;
    out.flush()?;

    let client = Client::builder().build()?;

    // ---- Step 1: scrape ----
    info!("Step 1: scraping the opinion section");
    let articles = scrape(&args, &settings, &client).await?;
    if articles.is_empty() {
        error!("No articles were scraped");
        return Err("no articles were scraped".into());
    }
    console::print_articles(&mut out, &articles)?;

    // ---- Step 2: translate ----
    info!("Step 2: translating headlines and analyzing word frequency");
    let (translations, repeated_words) =
        translate_and_analyze(&settings, &client, &articles).await?;
    console::print_translations(
        &mut out,
        &translations,
        &settings.source_language,
        &settings.target_language,
    )?;

    // ---- Step 3: report ----
    analysis::render_report(&repeated_words, settings.min_occurrences, &mut out)?;

    console::print_summary(
        &mut out,
        articles.len(),
        translations.len(),
        repeated_words.len(),
        settings.min_occurrences,
        images_dir.as_deref(),
    )?;
    out.flush()?;

    // ---- Optional JSON report ----
    if let Some(path) = &args.json_output {
        let now = Local::now();
        let report = RunReport {
            local_date: now.date_naive().to_string(),
            local_time: now.time().format("%H:%M:%S").to_string(),
            browser: args.browser.to_string(),
            source_language: settings.source_language.clone(),
            target_language: settings.target_language.clone(),
            min_occurrences: settings.min_occurrences,
            articles,
            translations,
            repeated_words,
        };
        json::write_report(&report, path).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Run complete"
    );

    Ok(())
}
