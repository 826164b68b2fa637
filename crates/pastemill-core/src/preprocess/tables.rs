//! Pseudo-table detection and conversion.
//!
//! Recovers two tabular shapes from plain text:
//!
//! - *Aligned*: consecutive lines splitting into an equal number of
//!   cells on tabs or ≥2-space gaps, first row as header.
//! - *Vertical/transposed*: a run of header-like lines followed by a
//!   flat run of value lines grouped column-major, including a
//!   multiline-cell variant that merges indented and bulleted
//!   continuation lines into the preceding cell.
//!
//! Vertical candidates are scored; a candidate must clear
//! [`MIN_ACCEPT_SCORE`] and beat the runner-up header count by
//! [`MIN_SCORE_MARGIN`]. Code-like blocks and bare API stanzas are
//! rejected unless explicit alignment separators override. The
//! thresholds are tuned against real documents; change them only with
//! characterization fixtures in hand.

use crate::fence::is_fence_line;
use crate::options::PrepareOptions;
use crate::preprocess::lines::{
    CellShape, classify_cell_shape, count_code_like_lines, get_list_number,
    has_strong_header_uniqueness, is_api_stanza_like_region, is_api_stanza_start,
    is_cell_like_line, is_continuation_line, is_header_like_horizontal, is_header_like_line,
    is_list_block_start, is_list_line, is_markdown_heading, is_paragraph_like_line,
    is_request_response_marker, split_pseudo_row,
};

/// Minimum composite score for accepting a vertical-table guess.
const MIN_ACCEPT_SCORE: f64 = 0.72;

/// Required lead over the runner-up header-count guess.
const MIN_SCORE_MARGIN: f64 = 0.08;

/// Minimum fraction of rows a column's dominant cell shape must cover.
const MIN_COLUMN_DOMINANCE: f64 = 0.65;

/// Score multiplier applied to 2-column guesses.
const TWO_COLUMN_PENALTY: f64 = 0.7;

/// Composite score weights: header quality, column consistency, cell
/// quality.
const HEADER_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.4;
const CELL_WEIGHT: f64 = 0.2;

/// Maximum header lines considered for a vertical table.
const MAX_HEADER_COUNT: usize = 12;

/// A detected vertical table: headers plus column-major grouped rows.
#[derive(Debug, PartialEq)]
struct VerticalTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Convert pseudo-tables in the text, returning the converted count.
pub(crate) fn convert_pseudo_tables(input: &str, options: &PrepareOptions) -> (String, usize) {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut output: Vec<String> = Vec::new();
    let mut converted = 0usize;
    let mut in_fence = false;
    let heading_level = usize::from(options.max_heading_depth).min(3);

    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push(line.to_owned());
            i += 1;
            continue;
        }
        if in_fence || is_markdown_heading(line) {
            output.push(line.to_owned());
            i += 1;
            continue;
        }

        if let Some((table, end)) = detect_vertical_table_multiline(&lines, i) {
            // A preceding non-cell line becomes the table's heading
            if i > 0 {
                let title_line = lines[i - 1];
                if !title_line.trim().is_empty()
                    && !is_header_like_line(title_line)
                    && !is_markdown_heading(title_line)
                    && !is_fence_line(title_line)
                {
                    output.push(make_heading(heading_level, title_line.trim()));
                }
            }
            output.extend(build_markdown_table(&table.headers, &table.rows));
            output.push(String::new());
            converted += 1;
            i = end;
            continue;
        }

        let Some(candidate) = find_candidate_block(&lines, i) else {
            output.push(line.to_owned());
            i += 1;
            continue;
        };

        let block_lines = &candidate.lines;
        let code_like = count_code_like_lines(&block_lines[..block_lines.len().min(8)]);
        if code_like >= 2 && candidate.alignment_lines < 3 {
            output.extend(block_lines.iter().map(|l| (*l).to_owned()));
            i = candidate.end;
            continue;
        }
        if is_api_stanza_like_region(block_lines) && candidate.alignment_lines < 3 {
            output.extend(block_lines.iter().map(|l| (*l).to_owned()));
            i = candidate.end;
            continue;
        }

        let title = (candidate.start > 0)
            .then(|| lines[candidate.start - 1])
            .filter(|title_line| {
                !title_line.trim().is_empty()
                    && !is_cell_like_line(title_line)
                    && !is_markdown_heading(title_line)
                    && !is_fence_line(title_line)
            })
            .map(|title_line| title_line.trim().to_owned());

        let tab_aligned = candidate
            .lines
            .iter()
            .all(|block_line| block_line.contains('\t'));
        let has_alignment = candidate.alignment_lines >= 3
            || (tab_aligned && candidate.alignment_lines == candidate.lines.len());
        let mut converted_block = false;

        if has_alignment {
            if let Some((headers, data_rows)) = detect_aligned_table(block_lines) {
                apply_title_heading(&mut output, title.as_deref(), heading_level);
                output.extend(build_markdown_table(&headers, &data_rows));
                output.push(String::new());
                converted += 1;
                converted_block = true;
            }
        }

        if !converted_block && !has_alignment {
            let trimmed: Vec<String> = block_lines.iter().map(|l| l.trim().to_owned()).collect();
            let mut vertical = detect_vertical_table(&trimmed);
            let mut title_from_block: Option<String> = None;

            // Retry with the first block line peeled off as a title
            if vertical.is_none() && block_lines.len() >= 4 {
                let first_line = block_lines[0].trim();
                if !first_line.is_empty()
                    && first_line.chars().count() <= 60
                    && !is_list_line(first_line)
                    && !is_markdown_heading(first_line)
                    && !is_paragraph_like_line(first_line)
                {
                    if let Some(table) = detect_vertical_table(&trimmed[1..]) {
                        vertical = Some(table);
                        title_from_block = Some(first_line.to_owned());
                    }
                }
            }

            if let Some(table) = vertical {
                apply_title_heading(
                    &mut output,
                    title_from_block.as_deref().or(title.as_deref()),
                    heading_level,
                );
                output.extend(build_markdown_table(&table.headers, &table.rows));
                output.push(String::new());
                converted += 1;
                converted_block = true;
            }
        }

        if !converted_block {
            output.extend(block_lines.iter().map(|l| (*l).to_owned()));
        }
        i = candidate.end;
    }

    (output.join("\n").trim_end().to_owned(), converted)
}

fn make_heading(level: usize, text: &str) -> String {
    format!("{} {}", "#".repeat(level), text.trim())
}

/// Emit a title as a heading, replacing it if it was just emitted as a
/// plain line.
fn apply_title_heading(output: &mut Vec<String>, title: Option<&str>, level: usize) {
    let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    if let Some(last) = output.last() {
        if last.trim() == title && !is_markdown_heading(last) {
            let heading = make_heading(level, title);
            *output.last_mut().expect("checked non-empty") = heading;
            return;
        }
    }
    output.push(make_heading(level, title));
}

fn escape_cell(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "—".to_owned()
    } else {
        trimmed.replace('|', "\\|")
    }
}

/// Render headers and rows as a pipe table, padding short rows.
fn build_markdown_table(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    let safe_headers: Vec<String> = headers.iter().map(|h| escape_cell(h)).collect();
    let header_line = format!("| {} |", safe_headers.join(" | "));
    let divider_line = format!(
        "| {} |",
        safe_headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    );

    let mut lines = vec![header_line, divider_line];
    for row in rows {
        let cells: Vec<String> = (0..safe_headers.len())
            .map(|index| escape_cell(row.get(index).map_or("", String::as_str)))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines
}

/// A run of candidate table lines.
struct CandidateBlock<'a> {
    start: usize,
    end: usize,
    lines: Vec<&'a str>,
    alignment_lines: usize,
}

/// Collect a contiguous run of cell-like lines starting at `start`.
fn find_candidate_block<'a>(lines: &[&'a str], start: usize) -> Option<CandidateBlock<'a>> {
    let start_line = *lines.get(start)?;
    if start_line.trim().is_empty()
        || is_markdown_heading(start_line)
        || is_list_block_start(lines, start)
        || is_fence_line(start_line)
        || !is_cell_like_line(start_line)
    {
        return None;
    }
    // A block whose alignment starts on the second line is anchored
    // there, not here
    let next = lines.get(start + 1).copied().unwrap_or("");
    if split_pseudo_row(start_line).is_none() && split_pseudo_row(next).is_some() {
        return None;
    }
    if is_api_stanza_start(lines, start) {
        let alignment_lines = lines[start..(start + 3).min(lines.len())]
            .iter()
            .filter(|line| split_pseudo_row(line).is_some())
            .count();
        if alignment_lines < 2 {
            return None;
        }
    }

    let mut block: Vec<&str> = Vec::new();
    let mut alignment_lines = 0usize;
    let mut i = start;
    while i < lines.len() {
        let current = lines[i];
        if current.trim().is_empty()
            || is_fence_line(current)
            || is_markdown_heading(current)
            || is_list_block_start(lines, i)
            || !is_cell_like_line(current)
        {
            break;
        }
        if is_api_stanza_start(lines, i) && alignment_lines < 3 {
            break;
        }
        if split_pseudo_row(current).is_some() {
            alignment_lines += 1;
        }
        block.push(current);
        i += 1;
    }

    // Tabs are unambiguous alignment, so a bare header + one data row
    // is still accepted; space-aligned blocks need more evidence
    let tab_aligned = block.len() >= 2 && block.iter().all(|line| line.contains('\t'));
    if block.len() < 3 && !tab_aligned {
        return None;
    }
    Some(CandidateBlock {
        start,
        end: i,
        lines: block,
        alignment_lines,
    })
}

/// Detect an aligned pseudo-table in a candidate block.
///
/// Returns headers and data rows once every gate passes: equal widths of
/// at least 3 columns, header-like first row, distinct headers, cell
/// quality, and column consistency.
fn detect_aligned_table(block_lines: &[&str]) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let rows: Vec<Vec<String>> = block_lines
        .iter()
        .map(|line| split_pseudo_row(line))
        .collect::<Option<Vec<_>>>()?;

    let column_count = rows.first()?.len();
    if column_count < 3 || !rows.iter().all(|row| row.len() == column_count) {
        return None;
    }

    let headers: Vec<String> = rows[0]
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                format!("Col{}", index + 1)
            } else {
                trimmed.to_owned()
            }
        })
        .collect();
    let data_rows: Vec<Vec<String>> = rows[1..].to_vec();
    let tab_aligned = block_lines.iter().all(|line| line.contains('\t'));
    let min_data_rows = if tab_aligned { 1 } else { 2 };
    if data_rows.len() < min_data_rows {
        return None;
    }

    let data_cells: Vec<String> = data_rows
        .iter()
        .flatten()
        .map(|cell| cell.trim().to_owned())
        .collect();
    if !headers.iter().all(|h| is_header_like_horizontal(h))
        || !has_strong_header_uniqueness(&headers)
        || !passes_cell_quality(&data_cells)
        || column_consistency_score(&data_rows) < MIN_COLUMN_DOMINANCE
    {
        return None;
    }

    Some((headers, data_rows))
}

/// Per-column dominant-shape consistency, 0 if any column is mixed.
fn column_consistency_score(rows: &[Vec<String>]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if column_count == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for col in 0..column_count {
        let mut tally: std::collections::HashMap<CellShape, usize> = std::collections::HashMap::new();
        for row in rows {
            let cell = row.get(col).map_or("", String::as_str);
            *tally.entry(classify_cell_shape(cell)).or_insert(0) += 1;
        }
        let dominant = tally.values().copied().max().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let ratio = dominant as f64 / rows.len() as f64;
        if ratio < MIN_COLUMN_DOMINANCE {
            return 0.0;
        }
        total += ratio;
    }
    #[allow(clippy::cast_precision_loss)]
    let score = total / column_count as f64;
    score
}

/// Header quality: label-like fraction plus a uniqueness bonus.
fn header_quality_score(headers: &[String]) -> f64 {
    if headers.is_empty() {
        return 0.0;
    }
    let valid = headers.iter().filter(|h| is_header_like_line(h)).count();
    let unique_bonus = if has_strong_header_uniqueness(headers) { 1.0 } else { 0.0 };
    #[allow(clippy::cast_precision_loss)]
    let valid_fraction = valid as f64 / headers.len() as f64;
    valid_fraction * 0.7 + unique_bonus * 0.3
}

fn average_cell_length(cells: &[String]) -> f64 {
    if cells.is_empty() {
        return 0.0;
    }
    let total: usize = cells.iter().map(|cell| cell.chars().count()).sum();
    #[allow(clippy::cast_precision_loss)]
    let average = total as f64 / cells.len() as f64;
    average
}

fn sentence_fraction(cells: &[String]) -> f64 {
    if cells.is_empty() {
        return 0.0;
    }
    let count = cells
        .iter()
        .filter(|cell| cell.contains(['.', '!', '?']))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let fraction = count as f64 / cells.len() as f64;
    fraction
}

/// Strict cell-quality gate for table acceptance.
fn passes_cell_quality(cells: &[String]) -> bool {
    if cells.is_empty() {
        return false;
    }
    let list_count = cells
        .iter()
        .filter(|cell| get_list_number(cell).is_some())
        .count();
    #[allow(clippy::cast_precision_loss)]
    let list_fraction = list_count as f64 / cells.len() as f64;
    average_cell_length(cells) <= 100.0 && sentence_fraction(cells) <= 0.5 && list_fraction <= 0.3
}

/// Loose cell-quality gate for multiline cells.
fn passes_cell_quality_loose(cells: &[String]) -> bool {
    !cells.is_empty() && average_cell_length(cells) <= 400.0 && sentence_fraction(cells) <= 0.7
}

/// Cell-quality contribution to the composite score.
fn cell_quality_score(cells: &[String]) -> f64 {
    if !passes_cell_quality(cells) {
        return 0.0;
    }
    ((100.0 - average_cell_length(cells)) / 100.0).clamp(0.0, 1.0)
}

/// Detect a vertical (transposed) table in a run of trimmed lines.
///
/// Tries every plausible header count, scores each guess, and accepts
/// only a clear winner.
fn detect_vertical_table(lines: &[String]) -> Option<VerticalTable> {
    if lines.len() < 6 {
        return None;
    }
    let mut best_score = 0.0f64;
    let mut best: Option<VerticalTable> = None;
    let mut second_score = 0.0f64;

    let header_run_line = |line: &String| {
        is_header_like_line(line)
            && line.trim().split_whitespace().count() <= 3
            && classify_cell_shape(line) == CellShape::Short
    };
    let header_run = lines
        .iter()
        .position(|line| !header_run_line(line))
        .unwrap_or(lines.len());
    let min_header_count = if header_run >= 3 { header_run } else { 2 };
    let max_headers = MAX_HEADER_COUNT.min(lines.len().saturating_sub(2));

    for header_count in 2..=max_headers {
        if header_run >= 3 && header_count < min_header_count {
            continue;
        }
        let headers: Vec<String> = lines[..header_count].to_vec();
        let values = &lines[header_count..];
        if values.len() < header_count * 2 {
            continue;
        }
        if header_count == 2 && values.len() < header_count * 3 {
            continue;
        }
        if values.len() % header_count != 0 {
            continue;
        }
        if !headers.iter().all(|h| is_header_like_line(h))
            || !has_strong_header_uniqueness(&headers)
        {
            continue;
        }

        let rows: Vec<Vec<String>> = values
            .chunks(header_count)
            .map(<[String]>::to_vec)
            .collect();

        let header_score = header_quality_score(&headers);
        let consistency_score = column_consistency_score(&rows);
        if consistency_score <= 0.0 {
            continue;
        }
        let cell_score = cell_quality_score(values);
        if cell_score <= 0.0 {
            continue;
        }

        let mut score = header_score * HEADER_WEIGHT
            + consistency_score * CONSISTENCY_WEIGHT
            + cell_score * CELL_WEIGHT;
        if header_count == 2 {
            score *= TWO_COLUMN_PENALTY;
        }
        if score > best_score {
            second_score = best_score;
            best_score = score;
            best = Some(VerticalTable { headers, rows });
        } else if score > second_score {
            second_score = score;
        }
    }

    let best = best?;
    if best_score < MIN_ACCEPT_SCORE || best_score - second_score < MIN_SCORE_MARGIN {
        return None;
    }
    Some(best)
}

/// Join a multiline cell's lines with explicit break markers.
fn build_cell_text(cell_lines: &[String]) -> String {
    cell_lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Detect a vertical table whose cells may span multiple lines.
///
/// Headers are a run of header-like lines; value lines start new cells
/// unless they continue the previous one (indentation or list markers).
/// The block ends at a fence, heading, request/response marker, or a
/// short blank run once at least one full row exists. Returns the table
/// and the index just past the consumed region.
fn detect_vertical_table_multiline(lines: &[&str], start: usize) -> Option<(VerticalTable, usize)> {
    let first = *lines.get(start)?;
    if !is_header_like_line(first) || is_request_response_marker(first) {
        return None;
    }

    let mut headers: Vec<String> = Vec::new();
    let mut cursor = start;
    while cursor < lines.len() && headers.len() < MAX_HEADER_COUNT {
        let line = lines[cursor];
        if line.trim().is_empty() || !is_header_like_line(line) {
            break;
        }
        headers.push(line.trim().to_owned());
        cursor += 1;
    }
    if headers.len() < 3 || !has_strong_header_uniqueness(&headers) {
        return None;
    }

    let mut cells: Vec<Vec<String>> = Vec::new();
    // Exclusive line index just past each closed cell; the consumed
    // region ends with the last cell that lands in a complete row, so
    // excess cells are re-emitted as text rather than lost
    let mut cell_ends: Vec<usize> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_last = cursor;
    let mut blank_run = 0usize;
    let mut last_list_number: Option<u64> = None;
    let mut in_list_block = false;

    let mut i = cursor;
    while i < lines.len() {
        let line = lines[i];
        if is_fence_line(line) || is_markdown_heading(line) || is_request_response_marker(line) {
            break;
        }
        if line.trim().is_empty() {
            blank_run += 1;
            if cells.len() >= headers.len() {
                let mut lookahead = i + 1;
                while lookahead < lines.len() && lines[lookahead].trim().is_empty() {
                    lookahead += 1;
                }
                let next_line = lines.get(lookahead).copied().unwrap_or("");
                if blank_run >= 1
                    && (is_request_response_marker(next_line)
                        || is_markdown_heading(next_line)
                        || is_header_like_line(next_line))
                {
                    break;
                }
            }
            if blank_run >= 2 && cells.len() >= headers.len() {
                break;
            }
            i += 1;
            continue;
        }
        blank_run = 0;

        let continuation = is_continuation_line(line);
        let list_number = get_list_number(line);

        // A list restarting at 1 after a higher ordinal begins a new
        // cell rather than continuing the current one
        let restarts_list = in_list_block
            && list_number == Some(1)
            && last_list_number.is_some_and(|last| last > 1);
        if !current.is_empty() && continuation && !restarts_list {
            current.push(line.to_owned());
            current_last = i;
            if let Some(number) = list_number {
                in_list_block = true;
                last_list_number = Some(number);
            }
            i += 1;
            continue;
        }

        if !current.is_empty() {
            cells.push(std::mem::take(&mut current));
            cell_ends.push(current_last + 1);
        }
        current = vec![line.to_owned()];
        current_last = i;
        in_list_block = list_number.is_some();
        last_list_number = list_number;
        i += 1;
    }

    if !current.is_empty() {
        cells.push(current);
        cell_ends.push(current_last + 1);
    }
    if cells.len() < headers.len() {
        return None;
    }

    let row_count = cells.len() / headers.len();
    let used_cells = row_count * headers.len();
    let end = cell_ends[used_cells - 1];

    let rows: Vec<Vec<String>> = (0..row_count)
        .map(|r| {
            cells[r * headers.len()..(r + 1) * headers.len()]
                .iter()
                .map(|cell| build_cell_text(cell))
                .collect()
        })
        .collect();

    let flattened: Vec<String> = rows.iter().flatten().cloned().collect();
    if !passes_cell_quality_loose(&flattened) {
        return None;
    }

    Some((VerticalTable { headers, rows }, end))
}
