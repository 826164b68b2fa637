//! Pseudo-heading promotion.
//!
//! Promotes three kinds of lines that function as section titles without
//! heading syntax: numbered outline lines ("1.2.3 Title"), standalone
//! titles directly above a table, and standalone lines matching a
//! configured heading hint. Heading depth tracking persists across the
//! scan so hint-promoted headings nest under the previous section.

use std::sync::LazyLock;

use regex::Regex;

use crate::fence::is_fence_line;
use crate::options::{HeadingHint, PrepareOptions};
use crate::preprocess::lines::{
    is_markdown_heading, is_markdown_table_start, is_pseudo_table_start, is_standalone_line,
};

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)*)([.)])\s+\S.{3,160}\s*$").expect("invalid numbered regex")
});

static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+(\.\d+)*[.)]\s+").expect("invalid prefix regex"));

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#{1,6})\s+").expect("invalid marker regex"));

static TERMINAL_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]$").expect("invalid punctuation regex"));

/// Outline-segment depth of a numbered heading line ("1.2.3" → 3).
fn numbered_depth(line: &str) -> Option<usize> {
    NUMBERED_HEADING
        .captures(line)
        .map(|caps| caps[1].split('.').count())
}

/// Strip the "1.2.3." prefix from a promoted title.
fn strip_number_prefix(line: &str) -> String {
    NUMBER_PREFIX.replace(line, "").trim().to_owned()
}

fn matches_heading_hint(line: &str, hints: &[HeadingHint]) -> bool {
    hints.iter().any(|hint| hint.matches(line))
}

/// Depth for a hint-promoted heading: one below the previous heading,
/// capped, or the preferred default.
fn next_heading_level(last_level: Option<usize>, max_depth: usize, preferred: usize) -> usize {
    match last_level {
        Some(last) if last < max_depth => (last + 1).min(max_depth),
        _ => preferred.min(max_depth),
    }
}

pub(crate) fn make_heading_line(level: usize, text: &str) -> String {
    format!("{} {}", "#".repeat(level), text.trim())
}

/// Promote pseudo-headings, returning the text and the promotion count.
pub(crate) fn promote_pseudo_headings(input: &str, options: &PrepareOptions) -> (String, usize) {
    if !options.promote_pseudo_headings {
        return (input.to_owned(), 0);
    }
    let max_depth = usize::from(options.max_heading_depth);
    let lines: Vec<&str> = input.split('\n').collect();
    let mut output: Vec<String> = Vec::new();
    let mut promoted = 0usize;
    let mut in_fence = false;
    let mut last_heading_level: Option<usize> = None;

    for (index, line) in lines.iter().enumerate() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push((*line).to_owned());
            continue;
        }
        if in_fence {
            output.push((*line).to_owned());
            continue;
        }
        if is_markdown_heading(line) {
            if let Some(caps) = HEADING_MARKER.captures(line) {
                last_heading_level = Some(caps[1].len());
            }
            output.push((*line).to_owned());
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            output.push((*line).to_owned());
            continue;
        }

        let standalone = is_standalone_line(&lines, index);

        if let Some(depth) = numbered_depth(trimmed) {
            let has_prev_gap = index == 0 || lines[index - 1].trim().is_empty();
            if !has_prev_gap || TERMINAL_PUNCTUATION.is_match(trimmed) {
                output.push((*line).to_owned());
                continue;
            }
            // A long numbered line right before another numbered line is
            // a list entry, not an outline heading
            let next_line = lines.get(index + 1).copied().unwrap_or("");
            let next_is_numbered = NUMBERED_HEADING.is_match(next_line);
            if next_is_numbered && trimmed.chars().count() > 80 && !next_line.trim().is_empty() {
                output.push((*line).to_owned());
                continue;
            }

            let level = (depth + 1).min(max_depth);
            output.push(make_heading_line(level, &strip_number_prefix(trimmed)));
            promoted += 1;
            last_heading_level = Some(level);
            continue;
        }

        let has_prev_gap = index == 0 || lines[index - 1].trim().is_empty();
        if has_prev_gap
            && (is_markdown_table_start(&lines, index + 1) || is_pseudo_table_start(&lines, index + 1))
        {
            let level = 2usize.min(max_depth);
            output.push(make_heading_line(level, trimmed));
            promoted += 1;
            last_heading_level = Some(level);
            continue;
        }

        let char_count = trimmed.chars().count();
        if standalone
            && matches_heading_hint(trimmed, &options.heading_hints)
            && (3..=160).contains(&char_count)
        {
            let level = next_heading_level(last_heading_level, max_depth, 2);
            output.push(make_heading_line(level, trimmed));
            promoted += 1;
            last_heading_level = Some(level);
            continue;
        }

        output.push((*line).to_owned());
    }

    (output.join("\n"), promoted)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn promote(input: &str) -> (String, usize) {
        promote_pseudo_headings(input, &PrepareOptions::default())
    }

    #[test]
    fn test_numbered_heading_promoted() {
        let (text, promoted) = promote("intro\n\n1. Section A\n\nbody");
        assert!(text.contains("## Section A"));
        assert_eq!(promoted, 1);
    }

    #[test]
    fn test_nested_numbered_heading_depth() {
        let (text, _) = promote("intro\n\n1.2. Subsection\n\nbody");
        assert!(text.contains("### Subsection"));
    }

    #[test]
    fn test_numbered_line_without_trailing_separator_kept() {
        // "1.2 Title" has no separator after the outline number, so it
        // is not an outline heading
        let (text, promoted) = promote("intro\n\n1.2 Subsection\n\nbody");
        assert_eq!(promoted, 0);
        assert!(text.contains("1.2 Subsection"));
    }

    #[test]
    fn test_depth_capped_at_max() {
        let (text, _) = promote("intro\n\n1.2.3.4.5. Deep\n\nbody");
        assert!(text.contains("#### Deep"));
        assert!(!text.contains("##### Deep"));
    }

    #[test]
    fn test_sentence_not_promoted() {
        let (text, promoted) = promote("intro\n\n1. This is a list item ending in a period.\n\nmore");
        assert!(!text.contains('#'));
        assert_eq!(promoted, 0);
        assert!(text.contains("1. This is a list item ending in a period."));
    }

    #[test]
    fn test_numbered_without_gap_not_promoted() {
        let (text, promoted) = promote("steps:\n1. First step\n2. Second step");
        assert!(!text.contains('#'));
        assert_eq!(promoted, 0);
    }

    #[test]
    fn test_table_title_promoted() {
        let input = "Summary Table\n| A | B |\n| --- | --- |\n| 1 | 2 |";
        let (text, promoted) = promote(input);
        assert!(text.contains("## Summary Table"));
        assert_eq!(promoted, 1);
    }

    #[test]
    fn test_pseudo_table_title_promoted() {
        let input = "Table Title\nName\tType\tValue\nAlpha\tText\tOne\nBeta\tText\tTwo";
        let (text, promoted) = promote(input);
        assert!(text.contains("## Table Title"));
        assert_eq!(promoted, 1);
    }

    #[test]
    fn test_hint_promotion_continues_depth() {
        let mut options = PrepareOptions::default();
        options.heading_hints = vec![crate::options::HeadingHint::from_spec("scope")];
        let input = "## Context\n\nbody\n\nProject scope\n\nmore";
        let (text, promoted) = promote_pseudo_headings(input, &options);
        assert!(text.contains("### Project scope"));
        assert_eq!(promoted, 1);
    }

    #[test]
    fn test_hint_without_match_not_promoted() {
        let mut options = PrepareOptions::default();
        options.heading_hints = vec![crate::options::HeadingHint::from_spec("scope")];
        let (text, promoted) = promote_pseudo_headings("## C\n\nUnrelated line\n\nx", &options);
        assert!(!text.contains("### Unrelated"));
        assert_eq!(promoted, 0);
    }

    #[test]
    fn test_fenced_content_untouched() {
        let input = "```\n1. Not a heading\n```";
        let (text, promoted) = promote(input);
        assert_eq!(text, input);
        assert_eq!(promoted, 0);
    }

    #[test]
    fn test_disabled_is_identity() {
        let mut options = PrepareOptions::default();
        options.promote_pseudo_headings = false;
        let input = "intro\n\n1. Section A\n\nbody";
        let (text, promoted) = promote_pseudo_headings(input, &options);
        assert_eq!(text, input);
        assert_eq!(promoted, 0);
    }
}
