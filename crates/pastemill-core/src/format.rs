//! Final canonical formatting.
//!
//! Re-prints the cleaned text through the parse/serialize round trip
//! and compacts table pipes. Formatting must never lose content: if the
//! re-printed text no longer carries the same plain text as its input,
//! the input is returned unchanged.

use crate::fence::FenceTracker;
use crate::tree::{blocks_text, normalize_text, parse_markdown, render_blocks};

/// Canonically re-print markdown; falls back to the input on any
/// formatting failure.
#[must_use]
pub(crate) fn format_markdown(text: &str) -> String {
    let blocks = parse_markdown(text);
    let before = normalize_text(&blocks_text(&blocks));
    let formatted = render_blocks(&blocks);

    // Formatting must be content-preserving; anything else counts as a
    // formatter failure and falls back to the unformatted text
    let after = normalize_text(&blocks_text(&parse_markdown(&formatted)));
    if after == before {
        formatted
    } else {
        text.to_owned()
    }
}

/// Trim interior cell whitespace on non-fenced pipe lines.
///
/// Leading indentation and the presence/absence of edge pipes are
/// preserved; escaped pipes (`\|`) stay part of their cell.
#[must_use]
pub(crate) fn compact_table_pipes(text: &str) -> String {
    let mut tracker = FenceTracker::new();
    let mut output: Vec<String> = Vec::new();

    for line in text.split('\n') {
        let is_marker = tracker.update(line);
        if is_marker || tracker.in_fence() {
            output.push(line.to_owned());
            continue;
        }
        output.push(compact_line(line));
    }

    output.join("\n")
}

fn compact_line(line: &str) -> String {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return line.to_owned();
    }
    if trimmed.matches('|').count() < 2 {
        return line.to_owned();
    }

    let prefix_len = line.len() - line.trim_start().len();
    let prefix = &line[..prefix_len];
    let has_trailing = trimmed.ends_with('|') && !trimmed.ends_with("\\|");

    let mut parts = split_unescaped_pipes(trimmed);
    // Leading pipe produces an empty first part
    if !parts.is_empty() {
        parts.remove(0);
    }
    if has_trailing && !parts.is_empty() {
        parts.pop();
    }
    let normalized: Vec<&str> = parts.iter().map(|part| part.trim()).collect();
    let content = normalized.join(" | ");
    if content.is_empty() {
        return line.to_owned();
    }

    let mut result = format!("| {content}");
    if has_trailing {
        result.push_str(" |");
    }
    format!("{prefix}{result}")
}

/// Split on pipes that are not escaped with a backslash.
fn split_unescaped_pipes(value: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                current.push(ch);
                escaped = true;
            }
            '|' => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}
