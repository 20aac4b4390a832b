//! Utility functions and helpers

use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Format a local timestamp for use inside identifiers and filenames.
///
/// ISO-8601 with microseconds, with `:` replaced by `-` so the result is
/// valid on every filesystem.
pub fn file_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S%.6f").to_string()
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Create a safe filename from a string
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// Truncate a string to a maximum number of characters, appending `...`
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
