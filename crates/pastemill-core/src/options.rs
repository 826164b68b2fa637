//! Pipeline options and their wire format.
//!
//! Options arrive as camelCase JSON at the HTTP boundary and as TOML/CLI
//! values elsewhere; both funnel into [`PrepareOptions`].

use regex::Regex;
use serde::{Deserialize, Deserializer};

/// Default cap on input length in characters.
pub const DEFAULT_MAX_CHARS: usize = 120_000;

/// Default deepest heading level produced or reported.
pub const DEFAULT_MAX_HEADING_DEPTH: u8 = 4;

/// How tables in the cleaned document are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    /// Keep pipe tables as-is (cells re-cleaned in place).
    #[default]
    Keep,
    /// Convert tables to `key: value` text blocks.
    Kv,
}

/// A heading hint: a literal substring or a regex pattern.
///
/// Deserialized from a string. A value wrapped in slashes (`/…/`) is
/// compiled as a regex; anything else matches as a case-insensitive
/// substring. A pattern that fails to compile degrades to a literal so
/// option handling never errors on user input.
#[derive(Clone, Debug)]
pub enum HeadingHint {
    /// Case-insensitive substring match (stored lowercased).
    Literal(String),
    /// Regex match against the whole line.
    Pattern(Regex),
}

impl HeadingHint {
    /// Build a hint from its string spec.
    #[must_use]
    pub fn from_spec(spec: &str) -> Self {
        if spec.len() > 2 && spec.starts_with('/') && spec.ends_with('/') {
            let body = &spec[1..spec.len() - 1];
            if let Ok(re) = Regex::new(body) {
                return Self::Pattern(re);
            }
        }
        Self::Literal(spec.to_lowercase())
    }

    /// Check whether a line matches this hint.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::Literal(needle) => line.to_lowercase().contains(needle),
            Self::Pattern(re) => re.is_match(line),
        }
    }
}

impl<'de> Deserialize<'de> for HeadingHint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = String::deserialize(deserializer)?;
        Ok(Self::from_spec(&spec))
    }
}

/// Options controlling the normalization pipeline.
///
/// Unknown fields are rejected so that typos at the HTTP boundary
/// surface as a 400 rather than silently falling back to defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PrepareOptions {
    /// Deepest heading level (1-6) produced by promotion and reported
    /// in the outline.
    #[serde(deserialize_with = "deserialize_heading_depth")]
    pub max_heading_depth: u8,
    /// Table handling mode.
    pub table_mode: TableMode,
    /// Merge or discard adjacent duplicate headings.
    pub dedupe_headings: bool,
    /// Drop attachment-artifact lines (filenames, size captions,
    /// placeholder glyphs).
    pub drop_artifacts: bool,
    /// Drop recognized noise lines.
    pub drop_noise_lines: bool,
    /// Input length cap in characters; longer input is truncated with a
    /// warning before any parsing.
    pub max_chars: usize,
    /// Promote pseudo-headings (numbered outlines, table titles, hint
    /// matches) to real headings.
    pub promote_pseudo_headings: bool,
    /// Extra hints marking standalone lines as headings.
    pub heading_hints: Vec<HeadingHint>,
    /// Split mixed numbered/bulleted blocks into Process/Requirements
    /// groups (opt-in).
    pub restructure_process_blocks: bool,
    /// Unwrap unlabelled fenced blocks that contain plain language.
    pub unwrap_accidental_fences: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            max_heading_depth: DEFAULT_MAX_HEADING_DEPTH,
            table_mode: TableMode::Keep,
            dedupe_headings: true,
            drop_artifacts: true,
            drop_noise_lines: true,
            max_chars: DEFAULT_MAX_CHARS,
            promote_pseudo_headings: true,
            heading_hints: Vec::new(),
            restructure_process_blocks: false,
            unwrap_accidental_fences: true,
        }
    }
}

/// Deserialize a heading depth, rejecting values outside 1-6.
fn deserialize_heading_depth<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let depth = u8::deserialize(deserializer)?;
    if (1..=6).contains(&depth) {
        Ok(depth)
    } else {
        Err(serde::de::Error::custom(format!(
            "maxHeadingDepth must be between 1 and 6, got {depth}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PrepareOptions::default();
        assert_eq!(options.max_heading_depth, 4);
        assert_eq!(options.table_mode, TableMode::Keep);
        assert!(options.dedupe_headings);
        assert!(options.drop_artifacts);
        assert_eq!(options.max_chars, 120_000);
        assert!(options.promote_pseudo_headings);
        assert!(!options.restructure_process_blocks);
        assert!(options.unwrap_accidental_fences);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let options: PrepareOptions =
            serde_json::from_str(r#"{"maxHeadingDepth": 3, "tableMode": "kv"}"#).unwrap();
        assert_eq!(options.max_heading_depth, 3);
        assert_eq!(options.table_mode, TableMode::Kv);
        // Unspecified fields fall back to defaults
        assert!(options.dedupe_headings);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<PrepareOptions>(r#"{"tableMoode": "kv"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_depth() {
        assert!(serde_json::from_str::<PrepareOptions>(r#"{"maxHeadingDepth": 0}"#).is_err());
        assert!(serde_json::from_str::<PrepareOptions>(r#"{"maxHeadingDepth": 7}"#).is_err());
    }

    #[test]
    fn test_heading_hint_literal() {
        let hint = HeadingHint::from_spec("Requirements");
        assert!(hint.matches("Functional requirements"));
        assert!(hint.matches("REQUIREMENTS"));
        assert!(!hint.matches("Overview"));
    }

    #[test]
    fn test_heading_hint_pattern() {
        let hint = HeadingHint::from_spec("/^Appendix [A-Z]$/");
        assert!(matches!(hint, HeadingHint::Pattern(_)));
        assert!(hint.matches("Appendix B"));
        assert!(!hint.matches("Appendix 1"));
    }

    #[test]
    fn test_heading_hint_bad_pattern_degrades_to_literal() {
        let hint = HeadingHint::from_spec("/[unclosed/");
        assert!(matches!(hint, HeadingHint::Literal(_)));
        assert!(hint.matches("see /[unclosed/ here"));
    }
}
