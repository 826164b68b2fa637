//! Inline technical-token wrapping.
//!
//! Wraps technical tokens sitting in prose (URLs, HTTP method + API
//! path pairs, field-access paths carrying an array-index marker, and
//! SCREAMING_SNAKE constants) in inline code so later formatting never
//! mangles them. Existing code spans are left untouched; overlapping
//! candidates resolve by earliest start, then longest span.

use std::sync::LazyLock;

use regex::Regex;

use crate::fence::is_fence_line;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("invalid url regex"));

static API_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[ \t])(?:(GET|POST|PUT|PATCH|DELETE)\s+)?(/(?:api|v\d+)/[^\s)`]+)")
        .expect("invalid api path regex")
});

static FIELD_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*(?:\[\])?(?:\.[A-Za-z_][A-Za-z0-9_]*(?:\[\])?)+\b")
        .expect("invalid field path regex")
});

static SCREAMING_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9]+(?:_[A-Z0-9]+)+\b").expect("invalid token regex"));

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("invalid code span regex"));

static ADJACENT_SPANS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)``([^`]+)`").expect("invalid adjacent span regex"));

/// Wrap technical tokens, returning the text and the wrap count.
pub(crate) fn wrap_technical_tokens(input: &str) -> (String, usize) {
    let mut output: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut wrapped = 0usize;

    for line in input.split('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push(line.to_owned());
            continue;
        }
        if in_fence {
            output.push(line.to_owned());
            continue;
        }
        output.push(process_line(line, &mut wrapped));
    }

    (output.join("\n"), wrapped)
}

/// Process one line, leaving existing code spans untouched.
fn process_line(line: &str, wrapped: &mut usize) -> String {
    let mut result = String::with_capacity(line.len());
    let mut cursor = 0usize;

    for span in CODE_SPAN.find_iter(line) {
        result.push_str(&wrap_segment(&line[cursor..span.start()], wrapped));
        result.push_str(span.as_str());
        cursor = span.end();
    }
    result.push_str(&wrap_segment(&line[cursor..], wrapped));

    separate_adjacent_code_spans(&result)
}

/// Wrap candidate tokens in one code-free segment.
fn wrap_segment(segment: &str, wrapped: &mut usize) -> String {
    let mut candidates: Vec<(usize, usize)> = Vec::new();

    for url in URL.find_iter(segment) {
        candidates.push((url.start(), url.end()));
    }
    for caps in API_PATH.captures_iter(segment) {
        if let Some(method) = caps.get(1) {
            candidates.push((method.start(), method.end()));
        }
        if let Some(path) = caps.get(2) {
            candidates.push((path.start(), path.end()));
        }
    }
    for caps in FIELD_PATH.find_iter(segment) {
        // Only paths with an array-index marker are unambiguous enough
        if caps.as_str().contains("[]") {
            candidates.push((caps.start(), caps.end()));
        }
    }
    for token in SCREAMING_TOKEN.find_iter(segment) {
        candidates.push((token.start(), token.end()));
    }

    let selected = select_ranges(candidates);
    if selected.is_empty() {
        return segment.to_owned();
    }

    let mut result = String::with_capacity(segment.len() + selected.len() * 2);
    let mut cursor = 0usize;
    for (start, end) in selected {
        result.push_str(&segment[cursor..start]);
        result.push('`');
        result.push_str(&segment[start..end]);
        result.push('`');
        cursor = end;
        *wrapped += 1;
    }
    result.push_str(&segment[cursor..]);
    result
}

/// Resolve overlaps: earliest start wins, then the longest span.
fn select_ranges(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut selected: Vec<(usize, usize)> = Vec::new();
    for range in ranges {
        match selected.last_mut() {
            Some(last) if range.0 < last.1 => {
                if range.0 == last.0 && range.1 > last.1 {
                    *last = range;
                }
            }
            _ => selected.push(range),
        }
    }
    selected
}

/// Split directly adjacent produced code spans apart.
fn separate_adjacent_code_spans(line: &str) -> String {
    let mut result = line.to_owned();
    loop {
        let next = ADJACENT_SPANS.replace_all(&result, "`$1` `$2`").into_owned();
        if next == result {
            return result;
        }
        result = next;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn wrap(input: &str) -> (String, usize) {
        wrap_technical_tokens(input)
    }

    #[test]
    fn test_url_wrapped_whole() {
        let (text, wrapped) = wrap("See https://example.com/api/orders?page=2 for details");
        assert_eq!(text, "See `https://example.com/api/orders?page=2` for details");
        assert_eq!(wrapped, 1);
    }

    #[test]
    fn test_method_and_path_wrapped_separately() {
        let (text, wrapped) = wrap("Call GET /api/orders to list");
        assert_eq!(text, "Call `GET` `/api/orders` to list");
        assert_eq!(wrapped, 2);
    }

    #[test]
    fn test_versioned_path_wrapped() {
        let (text, _) = wrap("Endpoint /v1/example is stable");
        assert_eq!(text, "Endpoint `/v1/example` is stable");
    }

    #[test]
    fn test_field_path_with_array_marker_wrapped() {
        let (text, _) = wrap("Read content[].supply.status from the payload");
        assert_eq!(text, "Read `content[].supply.status` from the payload");
    }

    #[test]
    fn test_plain_dotted_path_not_wrapped() {
        let (text, wrapped) = wrap("Visit example.com today");
        assert_eq!(text, "Visit example.com today");
        assert_eq!(wrapped, 0);
    }

    #[test]
    fn test_screaming_snake_wrapped() {
        let (text, _) = wrap("Status moves to READY_4_SHIPMENT next");
        assert_eq!(text, "Status moves to `READY_4_SHIPMENT` next");
    }

    #[test]
    fn test_single_word_caps_not_wrapped() {
        let (text, wrapped) = wrap("STATUS is a plain word");
        assert_eq!(text, "STATUS is a plain word");
        assert_eq!(wrapped, 0);
    }

    #[test]
    fn test_path_inside_url_not_double_wrapped() {
        let (text, wrapped) = wrap("https://host.example/api/orders is the base");
        assert_eq!(text, "`https://host.example/api/orders` is the base");
        assert_eq!(wrapped, 1);
    }

    #[test]
    fn test_existing_code_span_untouched() {
        let (text, wrapped) = wrap("already `GET /api/orders` wrapped");
        assert_eq!(text, "already `GET /api/orders` wrapped");
        assert_eq!(wrapped, 0);
    }

    #[test]
    fn test_fenced_lines_untouched() {
        let input = "```\nGET /api/orders\n```";
        let (text, wrapped) = wrap(input);
        assert_eq!(text, input);
        assert_eq!(wrapped, 0);
    }

    #[test]
    fn test_adjacent_spans_separated() {
        let separated = separate_adjacent_code_spans("`a``b``c`");
        assert_eq!(separated, "`a` `b` `c`");
    }

    #[test]
    fn test_nested_array_path() {
        let (text, _) = wrap("Map content[].delivery.containers[].items[].quantity here");
        assert_eq!(
            text,
            "Map `content[].delivery.containers[].items[].quantity` here"
        );
    }
}
