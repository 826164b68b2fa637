//! Tree cleanup.
//!
//! Recursively drops nodes that normalize to empty text, removes
//! artifact lines that survived preprocessing, converts tables to
//! key-value text when requested, and runs section-level cleanup:
//! empty headings merge into the previous section, empty sections drop
//! (unless a strictly deeper heading follows), and adjacent duplicate
//! headings merge or collapse.

use crate::options::{PrepareOptions, TableMode};
use crate::preprocess::is_attachment_artifact_line;

use super::{Block, Inline, ListItem, TableRow, blocks_text, inline_text, normalize_text};

/// Removal counters, surfaced as warnings.
#[derive(Debug, Default)]
struct RemovalStats {
    removed_attachment_artifacts: usize,
    removed_empty_headings: usize,
    removed_empty_sections: usize,
    collapsed_duplicate_headings: usize,
    converted_tables: usize,
    removed_empty_blocks: usize,
}

/// Result of cleaning: the new tree plus warnings.
pub(crate) struct CleanResult {
    pub blocks: Vec<Block>,
    pub warnings: Vec<String>,
}

/// Clean the block tree per the configured options.
pub(crate) fn clean_blocks(blocks: Vec<Block>, options: &PrepareOptions) -> CleanResult {
    let mut stats = RemovalStats::default();

    let cleaned: Vec<Block> = blocks
        .into_iter()
        .flat_map(|block| clean_block(block, options, &mut stats))
        .collect();

    let sections = split_sections(cleaned);
    let sections = merge_empty_headings(sections, &mut stats);
    let sections = remove_empty_sections(sections, &mut stats);
    let sections = dedupe_sections(sections, &mut stats, options.dedupe_headings);

    CleanResult {
        blocks: rebuild_blocks(sections),
        warnings: build_warnings(&stats),
    }
}

/// Whether a text line should be dropped outright.
fn should_drop_line(text: &str, options: &PrepareOptions, stats: &mut RemovalStats) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if options.drop_artifacts && is_attachment_artifact_line(trimmed) {
        stats.removed_attachment_artifacts += 1;
        return true;
    }
    false
}

/// Clean one block into zero or more replacement blocks.
fn clean_block(block: Block, options: &PrepareOptions, stats: &mut RemovalStats) -> Vec<Block> {
    match block {
        Block::Table { rows } => {
            if options.table_mode == TableMode::Kv {
                if let Some(kv_blocks) = table_to_key_value_blocks(&rows) {
                    stats.converted_tables += 1;
                    return kv_blocks;
                }
            }
            let cleaned_rows: Vec<TableRow> = rows
                .into_iter()
                .map(|row| TableRow {
                    cells: row.cells.into_iter().map(clean_inline_nodes).collect(),
                })
                .collect();
            vec![Block::Table { rows: cleaned_rows }]
        }
        Block::Heading { depth, children } => {
            let cleaned = clean_inline_nodes(children);
            let text = normalize_text(&inline_text(&cleaned));
            if text.is_empty() {
                stats.removed_empty_headings += 1;
                return Vec::new();
            }
            if should_drop_line(&text, options, stats) {
                return Vec::new();
            }
            vec![Block::Heading { depth, children: cleaned }]
        }
        Block::Paragraph(children) => {
            let cleaned = clean_inline_nodes(children);
            let text = normalize_text(&inline_text(&cleaned));
            if text.is_empty() {
                stats.removed_empty_blocks += 1;
                return Vec::new();
            }
            if should_drop_line(&text, options, stats) {
                return Vec::new();
            }
            vec![Block::Paragraph(cleaned)]
        }
        Block::List { ordered, start, items } => {
            let cleaned_items: Vec<ListItem> = items
                .into_iter()
                .filter_map(|item| clean_list_item(item, options, stats))
                .collect();
            if cleaned_items.is_empty() {
                stats.removed_empty_blocks += 1;
                return Vec::new();
            }
            vec![Block::List {
                ordered,
                start,
                items: cleaned_items,
            }]
        }
        Block::BlockQuote(children) => {
            let cleaned: Vec<Block> = children
                .into_iter()
                .flat_map(|child| clean_block(child, options, stats))
                .collect();
            if cleaned.is_empty() {
                return Vec::new();
            }
            vec![Block::BlockQuote(cleaned)]
        }
        Block::Html(raw) => {
            if raw.trim().is_empty() {
                stats.removed_empty_blocks += 1;
                return Vec::new();
            }
            vec![Block::Html(raw)]
        }
        block @ (Block::Code { .. } | Block::Rule) => vec![block],
    }
}

fn clean_list_item(
    item: ListItem,
    options: &PrepareOptions,
    stats: &mut RemovalStats,
) -> Option<ListItem> {
    let cleaned: Vec<Block> = item
        .blocks
        .into_iter()
        .flat_map(|block| clean_block(block, options, stats))
        .collect();
    if cleaned.is_empty() {
        stats.removed_empty_blocks += 1;
        return None;
    }
    let text = normalize_text(&blocks_text(&cleaned));
    if should_drop_line(&text, options, stats) {
        return None;
    }
    Some(ListItem { blocks: cleaned })
}

/// Drop inline nodes that normalize to nothing.
fn clean_inline_nodes(nodes: Vec<Inline>) -> Vec<Inline> {
    let mut output: Vec<Inline> = Vec::new();
    for node in nodes {
        match node {
            Inline::Text(value) => {
                if !value.trim().is_empty() {
                    output.push(Inline::Text(value));
                }
            }
            Inline::Emphasis(children) => {
                let cleaned = clean_inline_nodes(children);
                if !cleaned.is_empty() {
                    output.push(Inline::Emphasis(cleaned));
                }
            }
            Inline::Strong(children) => {
                let cleaned = clean_inline_nodes(children);
                if !cleaned.is_empty() {
                    output.push(Inline::Strong(cleaned));
                }
            }
            Inline::Strikethrough(children) => {
                let cleaned = clean_inline_nodes(children);
                if !cleaned.is_empty() {
                    output.push(Inline::Strikethrough(cleaned));
                }
            }
            Inline::Link { url, children } => {
                let cleaned = clean_inline_nodes(children);
                if !cleaned.is_empty() {
                    output.push(Inline::Link { url, children: cleaned });
                }
            }
            other => output.push(other),
        }
    }
    output
}

/// Convert a table to key-value text blocks.
///
/// 2-column tables become `key: value` lines; wider tables with a
/// usable header become one `Header: cell; …` paragraph per row;
/// anything else stays a table.
fn table_to_key_value_blocks(rows: &[TableRow]) -> Option<Vec<Block>> {
    if rows.is_empty() {
        return None;
    }
    let column_count = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
    if column_count == 0 {
        return None;
    }

    let has_header = rows.len() > 1;
    let header_cells: Vec<String> = rows[0]
        .cells
        .iter()
        .map(|cell| normalize_text(&inline_text(cell)))
        .collect();

    let mut lines: Vec<String> = Vec::new();

    if column_count == 2 {
        let start_index = usize::from(has_header);
        for row in &rows[start_index..] {
            let key = row
                .cells
                .first()
                .map(|cell| normalize_text(&inline_text(cell)))
                .unwrap_or_default();
            let value = row
                .cells
                .get(1)
                .map(|cell| normalize_text(&inline_text(cell)))
                .unwrap_or_default();
            match (key.is_empty(), value.is_empty()) {
                (true, true) => {}
                (false, false) => lines.push(format!("{key}: {value}")),
                (false, true) => lines.push(format!("{key}:")),
                (true, false) => lines.push(value),
            }
        }
    } else if has_header {
        let headers: Vec<String> = header_cells
            .iter()
            .enumerate()
            .map(|(index, header)| {
                if header.is_empty() {
                    format!("Column {}", index + 1)
                } else {
                    header.clone()
                }
            })
            .collect();
        for row in &rows[1..] {
            let pairs: Vec<String> = headers
                .iter()
                .enumerate()
                .map(|(index, header)| {
                    let value = row
                        .cells
                        .get(index)
                        .map(|cell| normalize_text(&inline_text(cell)))
                        .unwrap_or_default();
                    format!("{header}: {value}").trim().to_owned()
                })
                .collect();
            let line = pairs.join("; ").trim().to_owned();
            if !line.is_empty() {
                lines.push(line);
            }
        }
    } else {
        return None;
    }

    if lines.is_empty() {
        return None;
    }
    Some(
        lines
            .into_iter()
            .map(|line| Block::Paragraph(vec![Inline::Text(line)]))
            .collect(),
    )
}

/// A heading plus everything up to the next heading.
struct Section {
    heading: Option<(u8, Vec<Inline>)>,
    heading_text: String,
    content: Vec<Block>,
}

impl Section {
    fn headingless(content: Vec<Block>) -> Self {
        Self {
            heading: None,
            heading_text: String::new(),
            content,
        }
    }

    fn depth(&self) -> Option<u8> {
        self.heading.as_ref().map(|(depth, _)| *depth)
    }

    fn fingerprint(&self) -> String {
        normalize_text(&blocks_text(&self.content))
    }
}

/// Partition blocks into heading-delimited sections.
fn split_sections(blocks: Vec<Block>) -> Vec<Section> {
    let mut sections: Vec<Section> = vec![Section::headingless(Vec::new())];

    for block in blocks {
        match block {
            Block::Heading { depth, children } => {
                let heading_text = normalize_text(&inline_text(&children));
                sections.push(Section {
                    heading: Some((depth, children)),
                    heading_text,
                    content: Vec::new(),
                });
            }
            other => {
                sections
                    .last_mut()
                    .expect("sections start non-empty")
                    .content
                    .push(other);
            }
        }
    }

    sections
}

/// Merge sections whose heading normalized to empty text into the
/// previous section.
fn merge_empty_headings(sections: Vec<Section>, stats: &mut RemovalStats) -> Vec<Section> {
    let mut output: Vec<Section> = Vec::new();

    for section in sections {
        if section.heading.is_some() && section.heading_text.is_empty() {
            stats.removed_empty_headings += 1;
            if let Some(previous) = output.last_mut() {
                previous.content.extend(section.content);
            } else {
                output.push(Section::headingless(section.content));
            }
            continue;
        }
        output.push(section);
    }

    output
}

/// Drop empty sections; a heading with no content survives only when
/// the next section is strictly deeper.
fn remove_empty_sections(sections: Vec<Section>, stats: &mut RemovalStats) -> Vec<Section> {
    let depths: Vec<Option<u8>> = sections.iter().map(Section::depth).collect();
    let mut output: Vec<Section> = Vec::new();

    for (index, section) in sections.into_iter().enumerate() {
        let content_text = normalize_text(&blocks_text(&section.content));
        if section.heading.is_none() && content_text.is_empty() {
            continue;
        }
        if section.heading.is_some() && content_text.is_empty() {
            let next_depth = depths.get(index + 1).copied().flatten();
            let keeps_children = matches!(
                (section.depth(), next_depth),
                (Some(own), Some(next)) if next > own
            );
            if keeps_children {
                output.push(section);
            } else {
                stats.removed_empty_sections += 1;
            }
            continue;
        }
        output.push(section);
    }

    output
}

/// Merge or discard adjacent duplicate headings.
fn dedupe_sections(sections: Vec<Section>, stats: &mut RemovalStats, enabled: bool) -> Vec<Section> {
    if !enabled {
        return sections;
    }
    let mut output: Vec<Section> = Vec::new();

    for section in sections {
        if section.heading.is_none() {
            output.push(section);
            continue;
        }

        let duplicate_of_previous = output.last().is_some_and(|previous| {
            previous.heading.is_some()
                && !previous.heading_text.is_empty()
                && previous.heading_text.to_lowercase() == section.heading_text.to_lowercase()
                && previous.depth() == section.depth()
        });

        if duplicate_of_previous {
            let previous = output.last_mut().expect("checked non-empty");
            let prev_fingerprint = previous.fingerprint();
            if !prev_fingerprint.is_empty() && prev_fingerprint == section.fingerprint() {
                // Identical content: discard the duplicate outright
                stats.collapsed_duplicate_headings += 1;
                continue;
            }
            previous.content.extend(section.content);
            stats.collapsed_duplicate_headings += 1;
            continue;
        }

        output.push(section);
    }

    output
}

/// Flatten sections back into a block sequence.
fn rebuild_blocks(sections: Vec<Section>) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for section in sections {
        if let Some((depth, children)) = section.heading {
            blocks.push(Block::Heading { depth, children });
        }
        blocks.extend(section.content);
    }
    blocks
}

fn build_warnings(stats: &RemovalStats) -> Vec<String> {
    let mut warnings: Vec<String> = Vec::new();
    if stats.removed_attachment_artifacts > 0 {
        warnings.push(format!(
            "Removed {} attachment artifacts",
            stats.removed_attachment_artifacts
        ));
    }
    if stats.removed_empty_headings > 0 {
        warnings.push(format!("Removed {} empty headings", stats.removed_empty_headings));
    }
    if stats.removed_empty_sections > 0 {
        warnings.push(format!("Removed {} empty sections", stats.removed_empty_sections));
    }
    if stats.removed_empty_blocks > 0 {
        warnings.push(format!("Removed {} empty blocks", stats.removed_empty_blocks));
    }
    if stats.collapsed_duplicate_headings > 0 {
        warnings.push(format!(
            "Collapsed {} duplicate headings",
            stats.collapsed_duplicate_headings
        ));
    }
    if stats.converted_tables > 0 {
        warnings.push(format!(
            "Converted {} tables to key-value blocks",
            stats.converted_tables
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tree::parse_markdown;
    use crate::tree::render_blocks;

    fn clean(input: &str, options: &PrepareOptions) -> (String, Vec<String>) {
        let result = clean_blocks(parse_markdown(input), options);
        (render_blocks(&result.blocks), result.warnings)
    }

    #[test]
    fn test_empty_heading_merges_into_previous() {
        let options = PrepareOptions::default();
        let (text, warnings) = clean("# One\n\nbody\n\n#\n\nmore body", &options);
        assert!(text.contains("# One"));
        assert!(text.contains("more body"));
        assert!(warnings.iter().any(|w| w.contains("empty headings")));
    }

    #[test]
    fn test_empty_section_dropped() {
        let options = PrepareOptions::default();
        let (text, warnings) = clean("# Keep\n\ncontent\n\n# Empty\n\n# Next\n\ntail", &options);
        assert!(!text.contains("# Empty"));
        assert!(text.contains("# Next"));
        assert!(warnings.iter().any(|w| w.contains("empty sections")));
    }

    #[test]
    fn test_empty_parent_kept_when_child_deeper() {
        let options = PrepareOptions::default();
        let (text, _) = clean("# Parent\n\n## Child\n\ncontent", &options);
        assert!(text.contains("# Parent"));
        assert!(text.contains("## Child"));
    }

    #[test]
    fn test_duplicate_heading_sections_merge() {
        let options = PrepareOptions::default();
        let (text, warnings) = clean(
            "## Overview\n\nfirst part\n\n## Overview\n\nsecond part",
            &options,
        );
        assert_eq!(text.matches("## Overview").count(), 1);
        assert!(text.contains("first part"));
        assert!(text.contains("second part"));
        assert!(warnings.iter().any(|w| w.contains("duplicate headings")));
    }

    #[test]
    fn test_identical_duplicate_discarded() {
        let options = PrepareOptions::default();
        let (text, _) = clean("## Overview\n\nsame\n\n## Overview\n\nsame", &options);
        assert_eq!(text.matches("## Overview").count(), 1);
        assert_eq!(text.matches("same").count(), 1);
    }

    #[test]
    fn test_dedupe_disabled_keeps_both() {
        let mut options = PrepareOptions::default();
        options.dedupe_headings = false;
        let (text, _) = clean("## Overview\n\na\n\n## Overview\n\nb", &options);
        assert_eq!(text.matches("## Overview").count(), 2);
    }

    #[test]
    fn test_artifact_paragraph_dropped() {
        let options = PrepareOptions::default();
        let (text, warnings) = clean("Real sentence stays.\n\nphoto.png (2)", &options);
        assert!(text.contains("Real sentence stays."));
        assert!(!text.contains("photo.png"));
        assert!(warnings.iter().any(|w| w.contains("attachment artifacts")));
    }

    #[test]
    fn test_artifact_kept_when_disabled() {
        let mut options = PrepareOptions::default();
        options.drop_artifacts = false;
        let (text, _) = clean("photo.png (2)", &options);
        assert!(text.contains("photo.png (2)"));
    }

    #[test]
    fn test_kv_mode_two_columns() {
        let mut options = PrepareOptions::default();
        options.table_mode = TableMode::Kv;
        let (text, warnings) = clean(
            "| Key | Value |\n| --- | --- |\n| Owner | Team A |\n| Status | Draft |",
            &options,
        );
        assert!(text.contains("Owner: Team A"));
        assert!(text.contains("Status: Draft"));
        assert!(!text.contains('|'));
        assert!(warnings.iter().any(|w| w.contains("key-value")));
    }

    #[test]
    fn test_kv_mode_wide_table_row_paragraphs() {
        let mut options = PrepareOptions::default();
        options.table_mode = TableMode::Kv;
        let (text, _) = clean(
            "| Name | Type | Value |\n| --- | --- | --- |\n| Alpha | Text | One |",
            &options,
        );
        assert!(text.contains("Name: Alpha; Type: Text; Value: One"));
    }

    #[test]
    fn test_keep_mode_preserves_table() {
        let options = PrepareOptions::default();
        let (text, _) = clean("| Key | Value |\n| --- | --- |\n| Owner | Team A |", &options);
        assert!(text.contains("| Owner | Team A |"));
    }

    #[test]
    fn test_kv_key_only_and_value_only_rows() {
        let mut options = PrepareOptions::default();
        options.table_mode = TableMode::Kv;
        let (text, _) = clean(
            "| Key | Value |\n| --- | --- |\n| Lonely |  |\n|  | orphan value |",
            &options,
        );
        assert!(text.contains("Lonely:"));
        assert!(text.contains("orphan value"));
        assert!(!text.contains("Lonely: orphan"));
    }
}
