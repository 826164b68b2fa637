//! Attachment-artifact removal.
//!
//! Copy/paste from document tools leaves behind lines that carry no
//! content: attachment filenames ("photo.png (2)"), size captions
//! ("313.2 KB"), and object-replacement placeholder glyphs. These are
//! dropped wholesale; adjacent prose is untouched.

use std::sync::LazyLock;

use regex::Regex;

static FILE_NAME_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^\n\\/]+?\.(png|jpe?g|webp)(\s*\(\d+\))?$").expect("invalid filename regex")
});

static SIZE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+(\.\d+)?\s*(kb|mb|gb)\b").expect("invalid size regex"));

/// A bare attachment filename, with an optional "(n)" copy suffix.
pub(crate) fn is_attachment_filename_line(line: &str) -> bool {
    FILE_NAME_ONLY.is_match(line.trim())
}

/// A run of object-replacement placeholder glyphs and nothing else.
fn is_placeholder_glyph_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '\u{fffc}')
}

/// Any recognized artifact line.
pub(crate) fn is_attachment_artifact_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    is_attachment_filename_line(trimmed)
        || SIZE_ONLY.is_match(trimmed)
        || is_placeholder_glyph_line(trimmed)
}

/// Drop artifact lines, returning the text and the number removed.
pub(crate) fn remove_attachment_artifacts(input: &str) -> (String, usize) {
    let mut output: Vec<&str> = Vec::new();
    let mut removed = 0usize;

    for line in input.split('\n') {
        if is_attachment_artifact_line(line) {
            removed += 1;
        } else {
            output.push(line);
        }
    }

    (output.join("\n"), removed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_filename_lines() {
        assert!(is_attachment_artifact_line("photo.png"));
        assert!(is_attachment_artifact_line("photo.png (2)"));
        assert!(is_attachment_artifact_line("Черновик_with_overlays (4).png"));
        assert!(is_attachment_artifact_line("scan.JPEG"));
        assert!(!is_attachment_artifact_line("see photo.png for details"));
        assert!(!is_attachment_artifact_line("path/to/photo.png"));
    }

    #[test]
    fn test_size_lines() {
        assert!(is_attachment_artifact_line("313.2 KB"));
        assert!(is_attachment_artifact_line("2 mb"));
        assert!(!is_attachment_artifact_line("about 2 MB of data"));
    }

    #[test]
    fn test_placeholder_glyph_lines() {
        assert!(is_attachment_artifact_line("\u{fffc}"));
        assert!(is_attachment_artifact_line("\u{fffc}\u{fffc}\u{fffc}"));
        assert!(!is_attachment_artifact_line("text \u{fffc} text"));
    }

    #[test]
    fn test_removal_keeps_adjacent_prose() {
        let input = "Text before the attachment stays.\nphoto.png (2)\n313.2 KB\n\u{fffc}\nText after also stays.";
        let (text, removed) = remove_attachment_artifacts(input);
        assert_eq!(removed, 3);
        assert_eq!(
            text,
            "Text before the attachment stays.\nText after also stays."
        );
    }
}
