//! String helpers and file system checks.
//!
//! - Text truncation for console output and logs
//! - Filename sanitization for downloaded cover images
//! - Output directory validation

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static FORBIDDEN_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Longest filename produced by [`sanitize_filename`], in characters.
pub const MAX_FILENAME_LEN: usize = 100;

/// Turn arbitrary text (usually a headline) into a safe file stem.
///
/// Characters reserved on common file systems are removed, spaces become
/// underscores, runs of underscores collapse to one, the result is cut to
/// `max_len` characters and stripped of leading/trailing underscores.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("¿Qué pasa? Europa / hoy", 100), "¿Qué_pasa_Europa_hoy");
/// ```
pub fn sanitize_filename(text: &str, max_len: usize) -> String {
    let cleaned = FORBIDDEN_FILENAME_CHARS.replace_all(text, "");
    let underscored = cleaned.replace(' ', "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&underscored, "_");
    let truncated: String = collapsed.chars().take(max_len).collect();
    truncated.trim_matches('_').to_string()
}

/// Cut `text` to at most `max` characters, appending `...` when shortened.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_text(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
    }
}

/// Capitalize the first character of a string.
///
/// Used for log and banner labels (e.g. "chrome" -> "Chrome").
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
