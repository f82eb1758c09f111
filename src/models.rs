//! Data models passed between pipeline stages.
//!
//! - [`Article`]: one scraped opinion piece
//! - [`Translation`]: a headline and its translation
//! - [`RunReport`]: everything a run produced, serialized to JSON on request
//! - [`PlatformRun`]: what one BrowserStack platform produced in a parallel run

use crate::analysis::RankedResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A scraped opinion article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// The page the article was read from.
    pub url: String,
    /// Headline in the source language.
    pub title: String,
    /// The first paragraphs of the body.
    pub content: String,
    /// Absolute URL of the cover image, when one was found.
    pub image_url: Option<String>,
    /// Where the cover image was saved, when the download succeeded.
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

/// A headline in both languages.
///
/// `translated` equals `original` when translation failed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Translation {
    pub original: String,
    pub translated: String,
}

/// The full output of one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Run date in `YYYY-MM-DD` format.
    pub local_date: String,
    /// Run time in `HH:MM:SS` format.
    pub local_time: String,
    pub browser: String,
    pub source_language: String,
    pub target_language: String,
    pub min_occurrences: usize,
    pub articles: Vec<Article>,
    pub translations: Vec<Translation>,
    pub repeated_words: RankedResult,
}

/// Outcome of the pipeline on one hosted platform.
#[derive(Debug, Serialize)]
pub struct PlatformRun {
    pub platform: String,
    pub articles: Vec<Article>,
    pub translations: Vec<Translation>,
    pub repeated_words: RankedResult,
    /// Why the run failed; `None` when it passed.
    pub error: Option<String>,
}

impl PlatformRun {
    /// A run that stopped before producing anything.
    pub fn failed(platform: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            articles: Vec::new(),
            translations: Vec::new(),
            repeated_words: RankedResult::default(),
            error: Some(error.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;

    #[test]
    fn test_article_deserialization_without_image_path() {
        let json = r#"{
            "url": "https://elpais.com/opinion/2026-01-15/uno.html",
            "title": "Uno",
            "content": "Texto",
            "image_url": null
        }"#;

        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "Uno");
        assert!(article.image_url.is_none());
        assert!(article.image_path.is_none());
    }

    #[test]
    fn test_run_report_serialization() {
        let translations = vec![Translation {
            original: "La crisis".to_string(),
            translated: "The crisis".to_string(),
        }];
        let repeated_words = analyze(&["The crisis"], 1).unwrap();
        let report = RunReport {
            local_date: "2026-01-15".to_string(),
            local_time: "09:30:00".to_string(),
            browser: "chrome".to_string(),
            source_language: "es".to_string(),
            target_language: "en".to_string(),
            min_occurrences: 1,
            articles: vec![],
            translations,
            repeated_words,
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["local_date"], "2026-01-15");
        assert_eq!(json["translations"][0]["translated"], "The crisis");
        assert_eq!(json["repeated_words"][0]["word"], "the");
        assert_eq!(json["repeated_words"][1]["count"], 1);
    }

    #[test]
    fn test_failed_platform_run() {
        let run = PlatformRun::failed("iPhone 14 - Safari", "session not created");
        assert!(!run.passed());
        assert!(run.articles.is_empty());

        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["error"], "session not created");
        assert_eq!(json["repeated_words"], serde_json::json!([]));
    }
}
