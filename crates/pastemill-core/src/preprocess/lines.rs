//! Shared line predicates for the heuristic passes.
//!
//! Every predicate is a pure function over one line (or a line slice);
//! the thresholds mirror the tuned values from the production corpus
//! these heuristics were calibrated on.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#{1,6}\s+").expect("invalid heading regex"));

static TAB_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+").expect("invalid tab regex"));

static WIDE_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("invalid gap regex"));

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-*+•]|\d+[.)])\s+").expect("invalid list marker regex"));

static ORDERED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+").expect("invalid ordered prefix regex"));

static LIST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[.)]\s+").expect("invalid list number regex"));

static TERMINAL_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]$").expect("invalid punctuation regex"));

static SENTENCE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]").expect("invalid sentence regex"));

static CODE_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(enum|type|interface)\b").expect("invalid decl regex"));

static REQUEST_RESPONSE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(Запрос|Ответ|Формат ошибок|Request|Response)\s*:?\s*$")
        .expect("invalid marker regex")
});

static TABLE_DIVIDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?\s*:?-{2,}").expect("invalid divider regex"));

static NUMERIC_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+([.,]\d+)?$").expect("invalid numeric regex"));

static IDENTIFIER_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("invalid identifier regex"));

static HTTP_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(GET|POST|PUT|PATCH|DELETE)$").expect("invalid method regex"));

/// Shape class of a table cell, used for column consistency scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CellShape {
    Numeric,
    Identifier,
    Pathlike,
    Sentence,
    Short,
}

/// Classify a cell value into its dominant shape.
pub(crate) fn classify_cell_shape(value: &str) -> CellShape {
    let trimmed = value.trim();
    if NUMERIC_CELL.is_match(trimmed) {
        return CellShape::Numeric;
    }
    if IDENTIFIER_CELL.is_match(trimmed) {
        return CellShape::Identifier;
    }
    if !trimmed.is_empty()
        && !trimmed.chars().any(char::is_whitespace)
        && trimmed.chars().any(|c| c == '.' || c == '[')
    {
        return CellShape::Pathlike;
    }
    if trimmed.chars().any(char::is_whitespace) && SENTENCE_PUNCTUATION.is_match(trimmed) {
        return CellShape::Sentence;
    }
    CellShape::Short
}

/// Check for a canonical `#` heading line.
pub(crate) fn is_markdown_heading(line: &str) -> bool {
    MARKDOWN_HEADING.is_match(line)
}

/// Split a line into pseudo-table cells on tabs or ≥2-space gaps.
pub(crate) fn split_pseudo_row(line: &str) -> Option<Vec<String>> {
    if line.contains('\t') {
        return Some(TAB_SPLIT.split(line).map(|cell| cell.trim().to_owned()).collect());
    }
    if WIDE_GAP.is_match(line) {
        return Some(WIDE_GAP.split(line).map(|cell| cell.trim().to_owned()).collect());
    }
    None
}

/// A line that could be one row of an aligned pseudo-table.
pub(crate) fn is_pseudo_table_line(line: &str) -> bool {
    if line.trim().is_empty() || line.contains('|') || is_markdown_heading(line) {
        return false;
    }
    let Some(cells) = split_pseudo_row(line) else {
        return false;
    };
    cells.iter().filter(|cell| !cell.is_empty()).count() >= 3
}

/// A list item line (any marker style).
pub(crate) fn is_list_line(line: &str) -> bool {
    LIST_MARKER.is_match(line)
}

/// Two consecutive list lines start a list block.
pub(crate) fn is_list_block_start(lines: &[&str], index: usize) -> bool {
    let Some(current) = lines.get(index) else {
        return false;
    };
    if !is_list_line(current) {
        return false;
    }
    lines.get(index + 1).is_some_and(|next| is_list_line(next))
}

/// A line reading as running prose rather than a cell or label.
pub(crate) fn is_paragraph_like_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.chars().count() > 120 {
        return true;
    }
    let word_count = trimmed.split_whitespace().count();
    word_count >= 12 && SENTENCE_PUNCTUATION.is_match(trimmed)
}

/// A line short and label-like enough to be a vertical-table header.
pub(crate) fn is_header_like_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 80 {
        return false;
    }
    if TERMINAL_PUNCTUATION.is_match(trimmed) || ORDERED_PREFIX.is_match(trimmed) {
        return false;
    }
    if trimmed.matches(',').count() >= 2 {
        return false;
    }
    if trimmed.split_whitespace().count() > 6 {
        return false;
    }
    trimmed.chars().filter(char::is_ascii_digit).count() <= 4
}

/// Header check for aligned (horizontal) tables; tighter length bound.
pub(crate) fn is_header_like_horizontal(line: &str) -> bool {
    is_header_like_line(line) && line.trim().chars().count() <= 60
}

/// Minimum fraction of distinct headers for a believable header set.
pub(crate) const MIN_HEADER_UNIQUENESS: f64 = 0.8;

/// Check that headers are mostly distinct from one another.
pub(crate) fn has_strong_header_uniqueness(headers: &[String]) -> bool {
    if headers.is_empty() {
        return false;
    }
    let unique: HashSet<String> = headers
        .iter()
        .map(|header| header.trim().to_lowercase())
        .filter(|header| !header.is_empty())
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let ratio = unique.len() as f64 / headers.len() as f64;
    ratio >= MIN_HEADER_UNIQUENESS
}

/// A line that reads like code rather than prose.
pub(crate) fn is_code_like_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.contains('{') || trimmed.contains('}') {
        return true;
    }
    if trimmed.contains("=>") || trimmed.contains(';') {
        return true;
    }
    if trimmed.contains('`') {
        return true;
    }
    if trimmed.contains('[') || trimmed.contains(']') {
        return true;
    }
    if trimmed.contains("::") || trimmed.contains("<>") {
        return true;
    }
    if trimmed.matches(',').count() >= 2 {
        return true;
    }
    if CODE_DECLARATION.is_match(trimmed) {
        return true;
    }

    let letters = count_letters(trimmed);
    let symbols = trimmed
        .chars()
        .filter(|c| !is_letter(*c) && !c.is_ascii_digit() && !c.is_whitespace())
        .count();
    #[allow(clippy::cast_precision_loss)]
    let ratio_exceeded = letters > 0 && symbols as f64 / letters as f64 > 0.6;
    ratio_exceeded
}

/// Count code-like lines in a slice.
pub(crate) fn count_code_like_lines(lines: &[&str]) -> usize {
    lines.iter().filter(|line| is_code_like_line(line)).count()
}

/// A line that could serve as a table cell.
pub(crate) fn is_cell_like_line(line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    !is_markdown_heading(line)
        && !is_list_line(line)
        && !crate::fence::is_fence_line(line)
        && !is_paragraph_like_line(line)
}

/// A line continuing the previous cell (indented or a list item).
pub(crate) fn is_continuation_line(line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    line.starts_with(|c: char| c.is_whitespace()) || is_list_line(line)
}

/// Ordinal of an ordered-list line, if any.
pub(crate) fn get_list_number(line: &str) -> Option<u64> {
    LIST_NUMBER
        .captures(line.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// A literal request/response section marker.
pub(crate) fn is_request_response_marker(line: &str) -> bool {
    REQUEST_RESPONSE_MARKER.is_match(line.trim())
}

/// A line that is blank-delimited on both sides.
pub(crate) fn is_standalone_line(lines: &[&str], index: usize) -> bool {
    let Some(current) = lines.get(index) else {
        return false;
    };
    if current.trim().is_empty() {
        return false;
    }
    let has_prev_gap = index == 0 || lines[index - 1].trim().is_empty();
    let has_next_gap = index + 1 >= lines.len() || lines[index + 1].trim().is_empty();
    has_prev_gap && has_next_gap
}

/// Header + divider pair of a canonical pipe table.
pub(crate) fn is_markdown_table_start(lines: &[&str], index: usize) -> bool {
    if index + 1 >= lines.len() {
        return false;
    }
    let header = lines[index];
    let divider = lines[index + 1];
    header.contains('|') && TABLE_DIVIDER.is_match(divider)
}

/// Three consecutive pseudo-table lines start a pseudo-table.
pub(crate) fn is_pseudo_table_start(lines: &[&str], index: usize) -> bool {
    if index >= lines.len() || !is_pseudo_table_line(lines[index]) {
        return false;
    }
    let (Some(second), Some(third)) = (lines.get(index + 1), lines.get(index + 2)) else {
        return false;
    };
    is_pseudo_table_line(second) && is_pseudo_table_line(third)
}

/// Bare HTTP method line followed by a path line.
pub(crate) fn is_api_stanza_start(lines: &[&str], index: usize) -> bool {
    let current = lines.get(index).map_or("", |line| line.trim());
    let next = lines.get(index + 1).map_or("", |line| line.trim());
    HTTP_METHOD.is_match(current)
        && next.starts_with('/')
        && next.chars().nth(1).is_some_and(|c| !c.is_whitespace())
}

/// A line plausible within an API stanza (method, path, or short word).
fn is_api_like_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.len() >= 2 && trimmed.len() <= 8 && trimmed.chars().all(|c| c.is_ascii_uppercase()) {
        return true;
    }
    if trimmed.starts_with('/') && trimmed.len() > 1 && !trimmed.contains(char::is_whitespace) {
        return true;
    }
    trimmed.len() >= 3 && trimmed.len() <= 12 && trimmed.chars().all(|c| c.is_ascii_alphabetic())
}

/// Mostly API-like lines in the first few rows of a block.
pub(crate) fn is_api_stanza_like_region(lines: &[&str]) -> bool {
    let sample: Vec<&&str> = lines
        .iter()
        .take(8)
        .filter(|line| !line.trim().is_empty())
        .collect();
    if sample.len() < 3 {
        return false;
    }
    let api_like = sample.iter().filter(|line| is_api_like_line(line)).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = api_like as f64 / sample.len() as f64;
    ratio >= 0.7
}

/// Letters in the Latin and Cyrillic ranges the heuristics care about.
pub(crate) fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || ('А'..='я').contains(&c) || c == 'Ё' || c == 'ё'
}

/// Count heuristic letters in a string.
pub(crate) fn count_letters(text: &str) -> usize {
    text.chars().filter(|c| is_letter(*c)).count()
}
