//! Console sections.
//!
//! Every function writes to an injected [`Write`] so the layout can be
//! checked in tests; `main` passes stdout.

use crate::browser::BrowserKind;
use crate::config::Settings;
use crate::models::{Article, PlatformRun, Translation};
use crate::utils::{truncate_text, upcase};
use std::io::{self, Write};
use std::path::Path;

const SEPARATOR_WIDTH: usize = 80;
const CONTENT_PREVIEW_CHARS: usize = 300;

pub fn print_separator(out: &mut impl Write, ch: char) -> io::Result<()> {
    writeln!(out, "{}", ch.to_string().repeat(SEPARATOR_WIDTH))
}

fn print_heading(out: &mut impl Write, heading: &str) -> io::Result<()> {
    print_separator(out, '=')?;
    writeln!(out, "{heading}")?;
    print_separator(out, '=')
}

/// Title block with the effective configuration.
pub fn print_banner(
    out: &mut impl Write,
    settings: &Settings,
    browser: BrowserKind,
    headless: bool,
    mobile: bool,
    images_dir: Option<&Path>,
) -> io::Result<()> {
    print_heading(out, "EL PAÍS OPINION SECTION WEB SCRAPER")?;
    writeln!(out, "\nConfiguration:")?;
    writeln!(out, "  Browser: {}", upcase(&browser.to_string()))?;
    writeln!(out, "  Headless: {headless}")?;
    writeln!(out, "  Mobile: {mobile}")?;
    writeln!(out, "  Articles to scrape: {}", settings.num_articles)?;
    writeln!(
        out,
        "  Languages: {} -> {}",
        settings.source_language, settings.target_language
    )?;
    writeln!(out, "  Minimum occurrences: {}", settings.min_occurrences)?;
    match images_dir {
        Some(dir) => writeln!(out, "  Images directory: {}", dir.display())?,
        None => writeln!(out, "  Images directory: (downloads disabled)")?,
    }
    writeln!(out)
}

pub fn print_articles(out: &mut impl Write, articles: &[Article]) -> io::Result<()> {
    print_heading(out, "SCRAPED ARTICLES (original language)")?;
    for (i, article) in articles.iter().enumerate() {
        writeln!(out, "\n[Article {}]", i + 1)?;
        writeln!(out, "Title: {}", article.title)?;
        writeln!(
            out,
            "Content: {}",
            truncate_text(&article.content, CONTENT_PREVIEW_CHARS)
        )?;
        writeln!(
            out,
            "Image URL: {}",
            article.image_url.as_deref().unwrap_or("No image")
        )?;
        if let Some(path) = &article.image_path {
            writeln!(out, "Image saved: {}", path.display())?;
        }
        writeln!(out, "URL: {}", article.url)?;
        print_separator(out, '-')?;
    }
    Ok(())
}

pub fn print_translations(
    out: &mut impl Write,
    translations: &[Translation],
    source_language: &str,
    target_language: &str,
) -> io::Result<()> {
    let (src, tgt) = (source_language.to_uppercase(), target_language.to_uppercase());
    print_heading(out, &format!("TRANSLATED HEADLINES ({tgt})"))?;
    for (i, t) in translations.iter().enumerate() {
        writeln!(out, "\n[{}] Original ({src}): {}", i + 1, t.original)?;
        writeln!(out, "    Translated ({tgt}): {}", t.translated)?;
    }
    writeln!(out)
}

/// Closing counts for the run.
pub fn print_summary(
    out: &mut impl Write,
    articles: usize,
    translations: usize,
    repeated_words: usize,
    min_occurrences: usize,
    images_dir: Option<&Path>,
) -> io::Result<()> {
    print_heading(out, "SUMMARY")?;
    writeln!(out, "✓ Scraped {articles} articles")?;
    writeln!(out, "✓ Translated {translations} headlines")?;
    writeln!(
        out,
        "✓ Found {repeated_words} words appearing {min_occurrences}+ times"
    )?;
    if let Some(dir) = images_dir {
        writeln!(out, "✓ Images saved to: {}", dir.display())?;
    }
    print_separator(out, '=')
}

/// One block per BrowserStack platform, then the pass count.
pub fn print_platform_runs(
    out: &mut impl Write,
    runs: &[PlatformRun],
    min_occurrences: usize,
) -> io::Result<()> {
    print_heading(out, "BROWSERSTACK PLATFORM RESULTS")?;
    for run in runs {
        match &run.error {
            None => {
                writeln!(out, "\n✓ {}", run.platform)?;
                writeln!(
                    out,
                    "    {} articles, {} translations, {} words appearing {min_occurrences}+ times",
                    run.articles.len(),
                    run.translations.len(),
                    run.repeated_words.len()
                )?;
                for word in run.repeated_words.words() {
                    writeln!(out, "    {:<20} {:>6}", word.word, word.count)?;
                }
            }
            Some(error) => {
                writeln!(out, "\n✗ {}", run.platform)?;
                writeln!(out, "    {error}")?;
            }
        }
    }
    let passed = runs.iter().filter(|r| r.passed()).count();
    writeln!(out)?;
    print_separator(out, '-')?;
    writeln!(out, "{passed}/{} platforms passed", runs.len())?;
    print_separator(out, '=')
}
