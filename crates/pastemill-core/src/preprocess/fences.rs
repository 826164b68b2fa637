//! Fence repair passes.
//!
//! Pasted text frequently carries fences that should not be there
//! (prose accidentally wrapped in ``` by an export tool) and structured
//! payloads that should be fenced but are not (request/response bodies
//! following their marker line). These two passes fix both directions.

use std::sync::LazyLock;

use regex::Regex;

use crate::fence::{fence_info, is_fence_line};
use crate::preprocess::lines::{count_letters, is_markdown_heading, is_request_response_marker};

/// Minimum letter share of non-space characters for prose.
const MIN_LETTER_RATIO: f64 = 0.6;

/// Maximum code tokens tolerated inside an unwrappable block.
const MAX_CODE_TOKENS: usize = 2;

static COLON_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*\S").expect("invalid colon-value regex"));

static COMMENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//|\s*/\*").expect("invalid comment regex"));

/// Unwrap unlabelled fenced blocks that hold plain language.
///
/// A block is unwrapped when its letter-to-non-space ratio reaches
/// [`MIN_LETTER_RATIO`], it carries at most [`MAX_CODE_TOKENS`] code
/// tokens, and it is not JSON-shaped.
pub(crate) fn unwrap_accidental_fences(input: &str, enabled: bool) -> (String, usize) {
    if !enabled {
        return (input.to_owned(), 0);
    }
    let lines: Vec<&str> = input.split('\n').collect();
    let mut output: Vec<&str> = Vec::new();
    let mut unwrapped = 0usize;
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        if !is_fence_line(line) {
            output.push(line);
            i += 1;
            continue;
        }
        let info = fence_info(line);
        let mut j = i + 1;
        let mut block_lines: Vec<&str> = Vec::new();
        while j < lines.len() && !is_fence_line(lines[j]) {
            block_lines.push(lines[j]);
            j += 1;
        }
        // Unterminated fence: keep as-is
        if j >= lines.len() {
            output.push(line);
            output.extend(block_lines);
            i = j;
            continue;
        }
        // Labelled fences are intentional
        if !info.is_empty() {
            output.push(line);
            output.extend(block_lines);
            output.push(lines[j]);
            i = j + 1;
            continue;
        }

        let content = block_lines.join("\n");
        if looks_like_prose(&content) {
            output.extend(block_lines);
            unwrapped += 1;
        } else {
            output.push(line);
            output.extend(block_lines);
            output.push(lines[j]);
        }
        i = j + 1;
    }

    (output.join("\n"), unwrapped)
}

/// Prose test for fence unwrapping.
fn looks_like_prose(content: &str) -> bool {
    let non_space = content.chars().filter(|c| !c.is_whitespace()).count();
    let letters = count_letters(content);
    #[allow(clippy::cast_precision_loss)]
    let letter_ratio = if non_space == 0 {
        0.0
    } else {
        letters as f64 / non_space as f64
    };

    let code_tokens = content
        .chars()
        .filter(|c| matches!(c, '{' | '}' | '[' | ']' | ';'))
        .count()
        + content.matches("=>").count()
        + COLON_VALUE.find_iter(content).count();
    let has_json_shape =
        content.contains(['{', '[']) && COLON_VALUE.is_match(content);

    letter_ratio >= MIN_LETTER_RATIO && code_tokens <= MAX_CODE_TOKENS && !has_json_shape
}

/// Language tag for a request/response body.
///
/// JSON only when the block actually parses as JSON and carries no
/// comment markers; everything else stays plain text.
fn detect_fence_language(block: &str) -> &'static str {
    let trimmed = block.trim();
    if trimmed.is_empty() || COMMENT_MARKER.is_match(block) {
        return "text";
    }
    let json_shaped = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if json_shaped && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return "json";
    }
    "text"
}

/// Fence the line run following request/response markers.
pub(crate) fn wrap_request_response_blocks(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut output: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push(line.to_owned());
            i += 1;
            continue;
        }
        if in_fence || !is_request_response_marker(line) {
            output.push(line.to_owned());
            i += 1;
            continue;
        }

        output.push(line.trim().to_owned());
        // Already fenced: leave it alone
        if lines.get(i + 1).copied().is_some_and(is_fence_line) {
            i += 1;
            continue;
        }

        let mut block_lines: Vec<&str> = Vec::new();
        let mut j = i + 1;
        while j < lines.len() {
            let current = lines[j];
            if current.trim().is_empty()
                || is_fence_line(current)
                || is_markdown_heading(current)
                || is_request_response_marker(current)
            {
                break;
            }
            block_lines.push(current);
            j += 1;
        }

        if !block_lines.is_empty() {
            let block_text = block_lines.join("\n");
            let language = detect_fence_language(&block_text);
            output.push(format!("```{language}"));
            output.extend(block_lines.iter().map(|l| (*l).to_owned()));
            output.push("```".to_owned());
        }

        i = j;
    }

    output.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_prose_fence_unwrapped() {
        let input = "```\nThis fenced block is plain language.\nIt should not be fenced at all.\n```";
        let (text, unwrapped) = unwrap_accidental_fences(input, true);
        assert_eq!(unwrapped, 1);
        assert!(!text.contains("```"));
        assert!(text.contains("This fenced block is plain language."));
    }

    #[test]
    fn test_labelled_fence_kept() {
        let input = "```rust\nplain words inside a labelled fence\n```";
        let (text, unwrapped) = unwrap_accidental_fences(input, true);
        assert_eq!(unwrapped, 0);
        assert_eq!(text, input);
    }

    #[test]
    fn test_code_fence_kept() {
        let input = "```\nlet x = { a: 1 };\nreturn x;\n```";
        let (text, unwrapped) = unwrap_accidental_fences(input, true);
        assert_eq!(unwrapped, 0);
        assert_eq!(text, input);
    }

    #[test]
    fn test_json_shape_kept() {
        let input = "```\n{ \"status\": \"ok\" }\n```";
        let (text, unwrapped) = unwrap_accidental_fences(input, true);
        assert_eq!(unwrapped, 0);
        assert_eq!(text, input);
    }

    #[test]
    fn test_unterminated_fence_kept() {
        let input = "```\nno closing fence here";
        let (text, unwrapped) = unwrap_accidental_fences(input, true);
        assert_eq!(unwrapped, 0);
        assert_eq!(text, input);
    }

    #[test]
    fn test_disabled_is_identity() {
        let input = "```\nPlain language.\n```";
        let (text, unwrapped) = unwrap_accidental_fences(input, false);
        assert_eq!(unwrapped, 0);
        assert_eq!(text, input);
    }

    #[test]
    fn test_request_block_fenced_as_json() {
        let input = "Request:\n{ \"orderId\": 1 }\n\nnext paragraph";
        let text = wrap_request_response_blocks(input);
        assert!(text.contains("Request:\n```json\n{ \"orderId\": 1 }\n```"));
        assert!(text.contains("next paragraph"));
    }

    #[test]
    fn test_response_block_fenced_as_text() {
        let input = "Ответ:\nstatus=ok\ncode=200\n\ndone";
        let text = wrap_request_response_blocks(input);
        assert!(text.contains("Ответ:\n```text\nstatus=ok\ncode=200\n```"));
    }

    #[test]
    fn test_already_fenced_block_skipped() {
        let input = "Response:\n```json\n{}\n```";
        let text = wrap_request_response_blocks(input);
        assert_eq!(text, input);
    }

    #[test]
    fn test_marker_with_no_body() {
        let input = "Request:\n\nRegular text.";
        let text = wrap_request_response_blocks(input);
        assert_eq!(text, input);
    }

    #[test]
    fn test_json_with_comments_tagged_text() {
        let input = "Request:\n{ \"a\": 1 } // inline note";
        let text = wrap_request_response_blocks(input);
        assert!(text.contains("```text"));
    }
}
