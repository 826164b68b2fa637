//! Text normalization and structure-recovery pipeline.
//!
//! Ingests arbitrary pasted content (rich markup exported from document
//! tools, or noisy plain text copied from chat and ticket systems) and
//! produces canonical markdown, a heading outline, size stats, and
//! diagnostic warnings.
//!
//! # Pipeline
//!
//! ```text
//! raw input ──► format detection ──► sanitize + convert (HTML only)
//!     ──► normalize (line endings) ──► heuristic passes
//!     ──► tree build + clean ──► serialize ──► normalize (full)
//!     ──► canonical format ──► table compaction ──► result
//! ```
//!
//! Every stage is a total, synchronous function: malformed input never
//! raises, problems surface only through the warnings list, and the
//! same input with the same options always yields the same output.
//!
//! # Example
//!
//! ```
//! use pastemill_core::{PrepareOptions, prepare};
//!
//! let result = prepare("# Title\n\nBody text.", &PrepareOptions::default());
//! assert_eq!(result.outline, vec!["Title"]);
//! assert_eq!(result.cleaned_text, "# Title\n\nBody text.");
//! ```

mod convert;
mod detect;
mod fence;
mod format;
mod normalize;
mod options;
mod outline;
mod preprocess;
mod sanitize;
mod tree;

use serde::Serialize;

pub use detect::looks_like_html;
pub use normalize::{NormalizeOptions, collapse_blank_lines, normalize_markdown};
pub use options::{
    DEFAULT_MAX_CHARS, DEFAULT_MAX_HEADING_DEPTH, HeadingHint, PrepareOptions, TableMode,
};

/// Size metrics over the cleaned text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Character count.
    pub chars: usize,
    /// Line count (0 for empty text).
    pub lines: usize,
    /// Rough token estimate: `ceil(chars / 4)`.
    pub approx_tokens: usize,
}

/// Result of preparing a text.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResult {
    /// Canonical cleaned text.
    pub cleaned_text: String,
    /// Heading texts in document order, depth-filtered.
    pub outline: Vec<String>,
    /// Size metrics over `cleaned_text`.
    pub stats: Stats,
    /// Diagnostics from every pipeline stage, in stage order.
    pub warnings: Vec<String>,
}

/// Normalize pasted content into canonical structured text.
///
/// The primary pipeline entry point. Never fails: all heuristics are
/// total over arbitrary strings, and anything noteworthy is reported
/// through `warnings`.
#[must_use]
pub fn prepare(input: &str, options: &PrepareOptions) -> PrepareResult {
    let mut warnings: Vec<String> = Vec::new();

    // Truncation happens before any parsing so downstream work is
    // bounded by max_chars
    let mut working: String = if options.max_chars > 0 {
        let char_count = input.chars().count();
        if char_count > options.max_chars {
            warnings.push(format!("Truncated input to {} chars", options.max_chars));
            input.chars().take(options.max_chars).collect()
        } else {
            input.to_owned()
        }
    } else {
        input.to_owned()
    };

    if looks_like_html(&working) {
        let sanitized = sanitize::sanitize_html(&working);
        working = convert::html_to_markdown(&sanitized);
    }

    // Pass 1 keeps raw spacing intact; interior runs are evidence for
    // the table heuristics
    let normalized = normalize_markdown(&working, NormalizeOptions::line_endings_only());

    let (preprocessed, preprocess_warnings) = preprocess::preprocess_text(&normalized, options);
    warnings.extend(preprocess_warnings);

    let blocks = tree::parse_markdown(&preprocessed);
    let cleaned = tree::clean_blocks(blocks, options);
    warnings.extend(cleaned.warnings);

    let rendered = tree::render_blocks(&cleaned.blocks);
    let renormalized = normalize_markdown(&rendered, NormalizeOptions::default());
    let formatted = format::format_markdown(&renormalized);
    let compacted = format::compact_table_pipes(&formatted);
    let cleaned_text = compacted.trim().to_owned();

    let outline = outline::build_outline(&cleaned.blocks, options.max_heading_depth);
    let stats = build_stats(&cleaned_text);
    tracing::debug!(
        chars = stats.chars,
        outline_entries = outline.len(),
        warnings = warnings.len(),
        "Prepared text"
    );

    PrepareResult {
        cleaned_text,
        outline,
        stats,
        warnings,
    }
}

/// Compute size metrics for a cleaned text.
fn build_stats(cleaned_text: &str) -> Stats {
    let chars = cleaned_text.chars().count();
    let lines = if cleaned_text.is_empty() {
        0
    } else {
        cleaned_text.split('\n').count()
    };
    Stats {
        chars,
        lines,
        approx_tokens: chars.div_ceil(4),
    }
}
