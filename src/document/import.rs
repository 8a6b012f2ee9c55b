//! Plain-text import: one slide per delimited chunk

use std::path::Path;

pub const DEFAULT_IMPORT_DELIMITER: &str = "---";

/// Split imported text into slide texts
///
/// Chunks are trimmed and empty chunks dropped. A blank delimiter keeps the
/// whole (trimmed) text as a single slide.
pub fn split_import_text(text: &str, delimiter: &str) -> Vec<String> {
    let delimiter = delimiter.trim();
    let chunks: Vec<&str> = if delimiter.is_empty() {
        vec![text]
    } else {
        text.split(delimiter).collect()
    };
    chunks
        .into_iter()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// Title for an imported file: its name without a `.txt` extension
pub fn import_title_from_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".txt") => name[..cut].to_string(),
        _ => name.to_string(),
    }
}
