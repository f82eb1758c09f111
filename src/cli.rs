//! Command-line interface definitions.
//!
//! Browser selection and modes are flags; WebDriver endpoints and
//! BrowserStack credentials can also come from environment variables.

use crate::browser::BrowserKind;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Local chromedriver on the default port
/// opinion_wordfreq --browser chrome --headless
///
/// # Firefox through geckodriver, emulating nothing
/// opinion_wordfreq --browser firefox --webdriver-url http://localhost:4444
///
/// # No browser: plain HTTP fetches of the server-rendered pages
/// opinion_wordfreq --browser static --json-output report.json
///
/// # BrowserStack
/// BROWSERSTACK_USERNAME=me BROWSERSTACK_ACCESS_KEY=secret opinion_wordfreq --remote
///
/// # Every configured BrowserStack platform at once
/// BROWSERSTACK_USERNAME=me BROWSERSTACK_ACCESS_KEY=secret opinion_wordfreq --platforms
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Browser to use
    #[arg(short, long, value_enum, default_value_t = BrowserKind::Chrome)]
    pub browser: BrowserKind,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Emulate a mobile device (Chrome and Edge)
    #[arg(long)]
    pub mobile: bool,

    /// Optional path to a settings YAML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Minimum number of occurrences for a word to be reported
    #[arg(long)]
    pub min_occurrences: Option<usize>,

    /// Number of articles to scrape
    #[arg(short = 'n', long)]
    pub articles: Option<usize>,

    /// Directory for downloaded cover images
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Do not download cover images
    #[arg(long)]
    pub skip_images: bool,

    /// Write a JSON report of the run to this file
    #[arg(short, long)]
    pub json_output: Option<PathBuf>,

    /// WebDriver server for local runs
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Run on the BrowserStack hub instead of a local WebDriver server
    #[arg(long)]
    pub remote: bool,

    /// Run the pipeline on every configured BrowserStack platform in parallel
    #[arg(long, conflicts_with_all = ["remote", "json_output"])]
    pub platforms: bool,

    /// BrowserStack user name
    #[arg(long, env = "BROWSERSTACK_USERNAME")]
    pub browserstack_username: Option<String>,

    /// BrowserStack access key
    #[arg(long, env = "BROWSERSTACK_ACCESS_KEY", hide_env_values = true)]
    pub browserstack_access_key: Option<String>,
}
