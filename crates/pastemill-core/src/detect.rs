//! Input format detection.
//!
//! Decides whether pasted content is rich markup (HTML) or already
//! line-oriented text. A lone `<` in plain prose must not trigger the
//! markup path, so besides a doctype or `<html>` tag the detector
//! requires both an allow-listed opening tag and evidence of real
//! markup: a matching closing tag or a self-closing element.

use std::sync::LazyLock;

use regex::Regex;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<(html|head|body|div|span|p|br|hr|h[1-6]|ul|ol|li|table|thead|tbody|tfoot|tr|th|td|pre|code|blockquote|a|img)\b",
    )
    .expect("invalid open tag regex")
});

static CLOSE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</(html|head|body|div|span|p|h[1-6]|ul|ol|li|table|thead|tbody|tfoot|tr|th|td|pre|code|blockquote)\s*>",
    )
    .expect("invalid close tag regex")
});

static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype\s+html").expect("invalid doctype regex"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html\b").expect("invalid html tag regex"));

static SELF_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(br|hr|img)\b[^>]*/?>").expect("invalid self-closing regex"));

/// Check whether input looks like rich HTML markup.
#[must_use]
pub fn looks_like_html(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return false;
    }
    if DOCTYPE.is_match(trimmed) || HTML_TAG.is_match(trimmed) {
        return true;
    }
    if !OPEN_TAG.is_match(trimmed) {
        return false;
    }
    CLOSE_TAG.is_match(trimmed) || SELF_CLOSING.is_match(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(!looks_like_html(""));
        assert!(!looks_like_html("   \n  "));
    }

    #[test]
    fn test_doctype_forces_true() {
        assert!(looks_like_html("<!DOCTYPE html><p>x"));
        assert!(looks_like_html("<!doctype  HTML>"));
    }

    #[test]
    fn test_html_tag_forces_true() {
        assert!(looks_like_html("<html lang=\"en\">"));
    }

    #[test]
    fn test_open_and_close_pair() {
        assert!(looks_like_html("<p>Hello</p>"));
        assert!(looks_like_html("<h1>Title</h1><table><tr><td>x</td></tr></table>"));
    }

    #[test]
    fn test_self_closing_element() {
        assert!(looks_like_html("<p>line one<br>line two"));
        assert!(looks_like_html("<img src=\"x.png\" alt=\"x\"/>"));
    }

    #[test]
    fn test_open_tag_without_evidence_is_plain_text() {
        // An opening tag alone is not enough
        assert!(!looks_like_html("<p>just a stray tag in prose"));
    }

    #[test]
    fn test_plain_text_with_angle_bracket() {
        assert!(!looks_like_html("a < b and b > c"));
        assert!(!looks_like_html("Use <Enter> to confirm."));
    }

    #[test]
    fn test_markdown_is_not_html() {
        assert!(!looks_like_html("# Heading\n\n- item\n- item"));
    }
}
