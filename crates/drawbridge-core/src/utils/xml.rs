//! Textual diagram utilities: formatting and patch application.
//!
//! Diagrams are plain XML strings throughout; edits are exact-substring
//! search/replace, not a structural diff.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use drawbridge_tools::tools::EditOperation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("edit {index}: search fragment not found in diagram: {fragment}")]
    SearchNotFound { index: usize, fragment: String },

    #[error("edit {index}: search fragment is empty")]
    EmptySearch { index: usize },
}

/// Normalize a diagram snapshot into one tag per line with two-space
/// indentation. Idempotent, so snapshots can be normalized on every
/// submission without drifting.
pub fn normalize(snapshot: &str) -> String {
    static TAG_BOUNDARY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r">\s*<").expect("Failed to compile tag boundary regex"));

    let split = TAG_BOUNDARY.replace_all(snapshot.trim(), ">\n<");
    let mut depth: usize = 0;
    let mut lines = Vec::new();

    for line in split.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("</") {
            depth = depth.saturating_sub(1);
        }
        lines.push(format!("{}{}", "  ".repeat(depth), line));
        if opens_element(line) {
            depth += 1;
        }
    }

    lines.join("\n")
}

fn opens_element(line: &str) -> bool {
    line.starts_with('<')
        && !line.starts_with("</")
        && !line.starts_with("<?")
        && !line.starts_with("<!--")
        && !line.ends_with("/>")
        && !line.contains("</")
}

/// Apply search/replace edits to a snapshot, in order. Each edit replaces
/// the first occurrence of its search fragment; a fragment that does not
/// occur in the current text fails the whole sequence.
pub fn apply_edits(snapshot: &str, edits: &[EditOperation]) -> Result<String, PatchError> {
    let mut current = snapshot.to_string();
    for (index, edit) in edits.iter().enumerate() {
        if edit.search.is_empty() {
            return Err(PatchError::EmptySearch { index });
        }
        if !current.contains(&edit.search) {
            return Err(PatchError::SearchNotFound {
                index,
                fragment: edit.search.clone(),
            });
        }
        current = current.replacen(&edit.search, &edit.replace, 1);
    }
    Ok(current)
}
