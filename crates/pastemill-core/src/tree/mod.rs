//! Structural document tree.
//!
//! An owned sum-type representation of the canonical text: document →
//! blocks → inline spans. Nodes own their children outright; there are
//! no parent references, so the tree drops cleanly and clones freely
//! within a single pipeline invocation.

mod clean;
mod parse;
mod render;

pub(crate) use clean::{CleanResult, clean_blocks};
pub(crate) use parse::parse_markdown;
pub(crate) use render::render_blocks;

/// Block-level node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Block {
    Heading { depth: u8, children: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { ordered: bool, start: u64, items: Vec<ListItem> },
    Code { language: Option<String>, code: String },
    BlockQuote(Vec<Block>),
    Table { rows: Vec<TableRow> },
    Rule,
    Html(String),
}

/// A single list item: a sequence of blocks.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ListItem {
    pub blocks: Vec<Block>,
}

/// A table row: one inline run per cell.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TableRow {
    pub cells: Vec<Vec<Inline>>,
}

/// Inline (phrasing) node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, children: Vec<Inline> },
    Image { url: String, alt: String },
    SoftBreak,
    HardBreak,
}

/// Collapse whitespace runs and trim.
pub(crate) fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text of an inline run, one space between nodes.
pub(crate) fn inline_text(nodes: &[Inline]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for node in nodes {
        match node {
            Inline::Text(value) | Inline::Code(value) => parts.push(value.clone()),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link { children, .. } => parts.push(inline_text(children)),
            Inline::Image { alt, .. } => parts.push(alt.clone()),
            Inline::SoftBreak | Inline::HardBreak => parts.push(" ".to_owned()),
        }
    }
    parts.join(" ")
}

/// Plain text of a block subtree.
pub(crate) fn block_text(block: &Block) -> String {
    match block {
        Block::Heading { children, .. } | Block::Paragraph(children) => inline_text(children),
        Block::List { items, .. } => items
            .iter()
            .map(|item| blocks_text(&item.blocks))
            .collect::<Vec<_>>()
            .join(" "),
        Block::Code { code, .. } => code.clone(),
        Block::BlockQuote(children) => blocks_text(children),
        Block::Table { rows } => rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|cell| inline_text(cell))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(" "),
        Block::Rule => String::new(),
        Block::Html(raw) => raw.clone(),
    }
}

/// Plain text of a block sequence.
pub(crate) fn blocks_text(blocks: &[Block]) -> String {
    blocks.iter().map(block_text).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a\t b \n c  "), "a b c");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_inline_text_flattens_nesting() {
        let nodes = vec![
            Inline::Text("see".to_owned()),
            Inline::Strong(vec![Inline::Text("bold".to_owned())]),
            Inline::Code("x".to_owned()),
        ];
        assert_eq!(inline_text(&nodes), "see bold x");
    }

    #[test]
    fn test_block_text_table() {
        let table = Block::Table {
            rows: vec![TableRow {
                cells: vec![
                    vec![Inline::Text("Owner".to_owned())],
                    vec![Inline::Text("Team A".to_owned())],
                ],
            }],
        };
        assert_eq!(block_text(&table), "Owner Team A");
    }
}
