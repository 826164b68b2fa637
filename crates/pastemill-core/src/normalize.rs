//! Line-level canonicalization.
//!
//! Runs twice in the pipeline: a line-ending-only pass before the
//! heuristics (raw spacing is evidence for table detection and must
//! survive), and a full whitespace/list pass after tree cleaning.

use std::sync::LazyLock;

use regex::Regex;

use crate::fence::is_fence_line;

static UNORDERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([-*+•])\s+").expect("invalid unordered marker regex"));

static ORDERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(\d+)[.)]\s+").expect("invalid ordered marker regex"));

static LIST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(-|\d+\.)\s+").expect("invalid list line regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t ]+").expect("invalid whitespace run regex"));

static WIDE_WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("invalid wide whitespace run regex"));

/// Sub-pass toggles for [`normalize_markdown`].
#[derive(Clone, Copy, Debug)]
pub struct NormalizeOptions {
    /// Collapse interior whitespace runs (leading indentation is kept).
    pub collapse_spaces: bool,
    /// Insert blank-line boundaries around contiguous list blocks.
    pub format_lists: bool,
    /// Fully canonicalize whitespace outside fences.
    pub normalize_whitespace: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            collapse_spaces: true,
            format_lists: true,
            normalize_whitespace: true,
        }
    }
}

impl NormalizeOptions {
    /// The pre-heuristics pass: line endings and trailing whitespace
    /// only.
    #[must_use]
    pub fn line_endings_only() -> Self {
        Self {
            collapse_spaces: false,
            format_lists: false,
            normalize_whitespace: false,
        }
    }
}

/// Canonicalize line endings to `\n`.
fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Normalize spacing within one line, preserving leading indentation.
fn normalize_line_spaces(line: &str, collapse_spaces: bool, normalize_whitespace: bool) -> String {
    let safe_line = line.replace('\u{a0}', " ");
    let safe_line = safe_line.trim_end();
    if !collapse_spaces {
        return safe_line.to_owned();
    }
    let split = safe_line.len() - safe_line.trim_start().len();
    let (leading, rest) = safe_line.split_at(split);
    let collapsed = if normalize_whitespace {
        WHITESPACE_RUN.replace_all(rest, " ")
    } else {
        WIDE_WHITESPACE_RUN.replace_all(rest, " ")
    };
    format!("{leading}{collapsed}")
}

/// Collapse runs of blank lines down to `max_blank_lines`.
#[must_use]
pub fn collapse_blank_lines(input: &str, max_blank_lines: usize) -> String {
    let mut output: Vec<&str> = Vec::new();
    let mut blank_count = 0usize;

    for line in input.split('\n') {
        if line.trim().is_empty() {
            blank_count += 1;
            if blank_count <= max_blank_lines {
                output.push("");
            }
        } else {
            blank_count = 0;
            output.push(line);
        }
    }

    output.join("\n")
}

/// Canonicalize a markdown-ish text: line endings, list markers,
/// whitespace, and blank-line structure.
#[must_use]
pub fn normalize_markdown(input: &str, options: NormalizeOptions) -> String {
    let with_line_endings = normalize_line_endings(input);
    let mut output: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in with_line_endings.split('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push(line.trim_end().to_owned());
            continue;
        }
        if in_fence {
            output.push(line.replace('\u{a0}', " ").trim_end().to_owned());
            continue;
        }

        let normalized = normalize_line_spaces(line, options.collapse_spaces, options.normalize_whitespace);
        if let Some(caps) = UNORDERED_MARKER.captures(&normalized) {
            let indent = &caps[1];
            let rest = normalized[caps[0].len()..].trim();
            output.push(format!("{indent}- {rest}"));
            continue;
        }
        if let Some(caps) = ORDERED_MARKER.captures(&normalized) {
            let indent = &caps[1];
            let number = &caps[2];
            let rest = normalized[caps[0].len()..].trim();
            output.push(format!("{indent}{number}. {rest}"));
            continue;
        }
        output.push(normalized);
    }

    let formatted = if options.format_lists {
        format_list_blocks(output)
    } else {
        output
    };
    let joined = formatted.join("\n");
    let normalized = if options.normalize_whitespace {
        normalize_whitespace_outside_fences(&joined)
    } else {
        joined
    };

    collapse_blank_lines(&normalized, 2).trim().to_owned()
}

/// Surround contiguous list blocks with blank lines.
fn format_list_blocks(lines: Vec<String>) -> Vec<String> {
    let mut formatted: Vec<String> = Vec::new();
    let mut in_list = false;
    let mut in_fence = false;

    for line in lines {
        if is_fence_line(&line) {
            in_fence = !in_fence;
            formatted.push(line);
            continue;
        }
        if in_fence {
            formatted.push(line);
            continue;
        }

        if let Some(caps) = LIST_LINE.captures(&line) {
            if !in_list {
                formatted.push(String::new());
                in_list = true;
            }
            let indent = caps[1].to_owned();
            let marker = caps[2].to_owned();
            let content = line[caps[0].len()..].trim().to_owned();
            formatted.push(format!("{indent}{marker} {content}"));
            continue;
        }

        if in_list && !line.trim().is_empty() {
            formatted.push(String::new());
            in_list = false;
        }
        formatted.push(line);
    }

    formatted
}

/// Collapse all interior whitespace outside fences, keeping list indent.
fn normalize_whitespace_outside_fences(input: &str) -> String {
    let mut output: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in input.split('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push(line.trim_end().to_owned());
            continue;
        }
        if in_fence {
            output.push(line.trim_end().to_owned());
            continue;
        }

        if let Some(caps) = LIST_LINE.captures(line) {
            let indent = &caps[1];
            let marker = &caps[2];
            let content = WHITESPACE_RUN.replace_all(&line[caps[0].len()..], " ");
            output.push(format!("{indent}{marker} {}", content.trim_end()));
            continue;
        }

        let collapsed = WHITESPACE_RUN.replace_all(line, " ");
        output.push(collapsed.trim_end().trim_start_matches(' ').to_owned());
    }

    output.join("\n").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_line_endings() {
        let result = normalize_markdown("a\r\nb\rc", NormalizeOptions::line_endings_only());
        assert_eq!(result, "a\nb\nc");
    }

    #[test]
    fn test_bullet_markers_canonicalized() {
        let result = normalize_markdown("* one\n+ two\n• three", NormalizeOptions::default());
        assert_eq!(result, "- one\n- two\n- three");
    }

    #[test]
    fn test_ordered_markers_canonicalized() {
        let result = normalize_markdown("1) first\n2. second", NormalizeOptions::default());
        assert_eq!(result, "1. first\n2. second");
    }

    #[test]
    fn test_blank_lines_collapsed_to_two() {
        let result = normalize_markdown("a\n\n\n\n\nb", NormalizeOptions::default());
        assert_eq!(result, "a\n\n\nb");
    }

    #[test]
    fn test_list_block_gets_blank_boundaries() {
        let result = normalize_markdown("intro\n- one\n- two\noutro", NormalizeOptions::default());
        assert_eq!(result, "intro\n\n- one\n- two\n\noutro");
    }

    #[test]
    fn test_fenced_content_untouched() {
        let input = "```\nkeep    spacing\n```";
        let result = normalize_markdown(input, NormalizeOptions::default());
        assert_eq!(result, input);
    }

    #[test]
    fn test_nbsp_replaced() {
        let result = normalize_markdown("a\u{a0}b", NormalizeOptions::default());
        assert_eq!(result, "a b");
    }

    #[test]
    fn test_line_endings_only_preserves_interior_runs() {
        let result = normalize_markdown("Name\t\tValue", NormalizeOptions::line_endings_only());
        assert_eq!(result, "Name\t\tValue");
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let result = normalize_markdown("text   \nmore\t", NormalizeOptions::line_endings_only());
        assert_eq!(result, "text\nmore");
    }
}
