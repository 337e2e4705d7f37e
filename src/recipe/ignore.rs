//! Build-context exclusion file handling

use std::collections::HashSet;

/// Name of the exclusion file written to the project root
pub const IGNORE_FILE_NAME: &str = ".dockerignore";

/// Entries every generated exclusion file contains
pub const DEFAULT_IGNORE_ENTRIES: &[&str] = &["node_modules/", ".git/", "npm-debug.log"];

/// Union of the existing exclusion entries, the default set and `extra`.
///
/// Existing lines are right-trimmed and kept in place, blank lines are
/// dropped, and every entry appears once in first-seen order. Applying the
/// merge to its own output yields the same list.
pub fn merge_ignore<S: AsRef<str>>(existing_lines: &[S], extra: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    let candidates = existing_lines
        .iter()
        .map(|line| line.as_ref())
        .chain(DEFAULT_IGNORE_ENTRIES.iter().copied())
        .chain(extra.iter().map(String::as_str));

    for line in candidates {
        let entry = line.trim_end();
        if entry.trim().is_empty() {
            continue;
        }
        if seen.insert(entry.to_string()) {
            merged.push(entry.to_string());
        }
    }

    merged
}

/// Render entries as file content, one per line with a trailing newline
pub fn render_ignore(entries: &[String]) -> String {
    let mut content = entries.join("\n");
    content.push('\n');
    content
}
